use sqlx::PgConnection;

use crate::models::rows::CustomerActivityRow;
use crate::models::DateRange;

/// Every registered customer with their activity inside the period, including
/// customers without orders (orders = 0).
pub async fn fetch_activity(conn: &mut PgConnection, range: &DateRange) -> Result<Vec<CustomerActivityRow>, sqlx::Error> {
    sqlx::query_as::<_, CustomerActivityRow>(
        r#"
        SELECT
            cl.ci::text AS ci,
            cl.nombre AS name,
            COUNT(p.id) AS orders,
            COALESCE(SUM(p.total), 0)::double precision AS total_spent,
            MAX(p.fecha_pedido)::date AS last_purchase
        FROM cliente cl
        LEFT JOIN pedido p
            ON p.ci_cliente = cl.ci
           AND p.fecha_pedido::date BETWEEN $1 AND $2
        GROUP BY cl.ci, cl.nombre
        ORDER BY orders DESC, total_spent DESC, cl.ci ASC
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(conn)
    .await
}
