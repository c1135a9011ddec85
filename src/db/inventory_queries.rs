use sqlx::PgConnection;

use crate::models::rows::{ProductStockRow, SupplyStockRow};

// Stock is a point-in-time snapshot; these queries ignore the report period.

pub async fn fetch_product_stock(conn: &mut PgConnection) -> Result<Vec<ProductStockRow>, sqlx::Error> {
    sqlx::query_as::<_, ProductStockRow>(
        r#"
        SELECT
            pr.nombre AS product,
            COALESCE(c.nombre, 'Sin categoria') AS category,
            COALESCE(pr.stock, 0)::double precision AS stock,
            COALESCE(pr.stock_minimo, 0)::double precision AS min_stock,
            COALESCE(pr.precio, 0)::double precision AS price
        FROM producto pr
        LEFT JOIN categoria c ON c.id = pr.id_categoria
        ORDER BY pr.stock ASC, pr.id ASC
        "#,
    )
    .fetch_all(conn)
    .await
}

pub async fn fetch_supply_stock(conn: &mut PgConnection) -> Result<Vec<SupplyStockRow>, sqlx::Error> {
    sqlx::query_as::<_, SupplyStockRow>(
        r#"
        SELECT
            i.nombre AS supply,
            COALESCE(i.stock, 0)::double precision AS stock,
            COALESCE(i.stock_minimo, 0)::double precision AS min_stock,
            i.medida AS unit
        FROM insumo i
        ORDER BY i.stock ASC, i.id ASC
        "#,
    )
    .fetch_all(conn)
    .await
}
