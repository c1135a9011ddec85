use sqlx::PgConnection;

use crate::models::rows::{CategorySalesRow, CustomerSalesRow, DailySalesRow, ProductSalesRow, SalesSummaryRow};
use crate::models::DateRange;

/// Period totals over order lines.
pub async fn fetch_summary(conn: &mut PgConnection, range: &DateRange) -> Result<SalesSummaryRow, sqlx::Error> {
    sqlx::query_as::<_, SalesSummaryRow>(
        r#"
        SELECT
            COALESCE(SUM(pp.total), 0)::double precision AS total_sales,
            COUNT(DISTINCT p.id) AS order_count,
            COALESCE(SUM(pp.cantidad), 0)::double precision AS units_sold,
            COUNT(DISTINCT p.ci_cliente) AS unique_customers
        FROM pedido p
        LEFT JOIN pedido_producto pp ON pp.id_pedido = p.id
        WHERE p.fecha_pedido::date BETWEEN $1 AND $2
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_one(conn)
    .await
}

pub async fn fetch_by_category(conn: &mut PgConnection, range: &DateRange) -> Result<Vec<CategorySalesRow>, sqlx::Error> {
    sqlx::query_as::<_, CategorySalesRow>(
        r#"
        SELECT
            c.nombre AS category,
            COALESCE(SUM(pp.cantidad), 0)::double precision AS units,
            COALESCE(SUM(pp.total), 0)::double precision AS total_sales,
            COUNT(DISTINCT p.id) AS orders,
            COALESCE(AVG(pp.precio), 0)::double precision AS average_price
        FROM pedido_producto pp
        JOIN pedido p ON p.id = pp.id_pedido
        JOIN producto pr ON pr.id = pp.id_producto
        JOIN categoria c ON c.id = pr.id_categoria
        WHERE p.fecha_pedido::date BETWEEN $1 AND $2
        GROUP BY c.id, c.nombre
        ORDER BY total_sales DESC, MIN(c.id) ASC
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(conn)
    .await
}

pub async fn fetch_top_products(
    conn: &mut PgConnection,
    range: &DateRange,
    limit: i64,
) -> Result<Vec<ProductSalesRow>, sqlx::Error> {
    sqlx::query_as::<_, ProductSalesRow>(
        r#"
        SELECT
            pr.nombre AS product,
            COALESCE(c.nombre, 'Sin categoria') AS category,
            COALESCE(SUM(pp.cantidad), 0)::double precision AS units,
            COALESCE(SUM(pp.total), 0)::double precision AS revenue,
            COALESCE(AVG(pp.precio), 0)::double precision AS average_price
        FROM pedido_producto pp
        JOIN pedido p ON p.id = pp.id_pedido
        JOIN producto pr ON pr.id = pp.id_producto
        LEFT JOIN categoria c ON c.id = pr.id_categoria
        WHERE p.fecha_pedido::date BETWEEN $1 AND $2
        GROUP BY pr.id, pr.nombre, c.nombre
        ORDER BY units DESC, MIN(pr.id) ASC
        LIMIT $3
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .bind(limit)
    .fetch_all(conn)
    .await
}

pub async fn fetch_top_customers(
    conn: &mut PgConnection,
    range: &DateRange,
    limit: i64,
) -> Result<Vec<CustomerSalesRow>, sqlx::Error> {
    sqlx::query_as::<_, CustomerSalesRow>(
        r#"
        SELECT
            cl.ci::text AS ci,
            cl.nombre AS customer,
            COUNT(p.id) AS orders,
            COALESCE(SUM(p.total), 0)::double precision AS total_spent
        FROM pedido p
        JOIN cliente cl ON cl.ci = p.ci_cliente
        WHERE p.fecha_pedido::date BETWEEN $1 AND $2
        GROUP BY cl.ci, cl.nombre
        ORDER BY total_spent DESC, MIN(p.id) ASC
        LIMIT $3
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .bind(limit)
    .fetch_all(conn)
    .await
}

/// One row per calendar day that had at least one order, oldest first.
pub async fn fetch_daily(conn: &mut PgConnection, range: &DateRange) -> Result<Vec<DailySalesRow>, sqlx::Error> {
    sqlx::query_as::<_, DailySalesRow>(
        r#"
        SELECT
            p.fecha_pedido::date AS day,
            COUNT(p.id) AS orders,
            COALESCE(SUM(p.total), 0)::double precision AS total
        FROM pedido p
        WHERE p.fecha_pedido::date BETWEEN $1 AND $2
        GROUP BY p.fecha_pedido::date
        ORDER BY day ASC
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(conn)
    .await
}
