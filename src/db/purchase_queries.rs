use sqlx::PgConnection;

use crate::models::rows::{PurchaseRow, SupplyPurchaseRow};
use crate::models::DateRange;

/// Purchase notes in the period with their line totals.
pub async fn fetch_purchases(conn: &mut PgConnection, range: &DateRange) -> Result<Vec<PurchaseRow>, sqlx::Error> {
    sqlx::query_as::<_, PurchaseRow>(
        r#"
        SELECT
            nc.id::bigint AS id,
            nc.fecha_pedido::date AS ordered_on,
            nc.fecha_entrega::date AS delivery_on,
            COALESCE(pv.nombre, 'Sin proveedor') AS supplier,
            COALESCE(SUM(ci.cantidad), 0)::double precision AS items,
            COALESCE(SUM(ci.total), 0)::double precision AS total
        FROM nota_compra nc
        LEFT JOIN proveedor pv ON pv.codigo = nc.codigo_proveedor
        LEFT JOIN compra_insumo ci ON ci.id_nota_compra = nc.id
        WHERE nc.fecha_pedido::date BETWEEN $1 AND $2
        GROUP BY nc.id, nc.fecha_pedido, nc.fecha_entrega, pv.nombre
        ORDER BY nc.fecha_pedido ASC, nc.id ASC
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(conn)
    .await
}

pub async fn fetch_top_supplies(
    conn: &mut PgConnection,
    range: &DateRange,
    limit: i64,
) -> Result<Vec<SupplyPurchaseRow>, sqlx::Error> {
    sqlx::query_as::<_, SupplyPurchaseRow>(
        r#"
        SELECT
            i.nombre AS supply,
            COALESCE(SUM(ci.cantidad), 0)::double precision AS quantity,
            COALESCE(SUM(ci.total), 0)::double precision AS total
        FROM compra_insumo ci
        JOIN nota_compra nc ON nc.id = ci.id_nota_compra
        JOIN insumo i ON i.id = ci.id_insumo
        WHERE nc.fecha_pedido::date BETWEEN $1 AND $2
        GROUP BY i.id, i.nombre
        ORDER BY total DESC, MIN(i.id) ASC
        LIMIT $3
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .bind(limit)
    .fetch_all(conn)
    .await
}
