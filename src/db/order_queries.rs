use sqlx::PgConnection;

use crate::models::rows::OrderRow;
use crate::models::DateRange;

pub async fn fetch_orders(conn: &mut PgConnection, range: &DateRange) -> Result<Vec<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT
            p.id::bigint AS id,
            p.fecha_pedido::date AS ordered_on,
            p.fecha_entrega::date AS delivery_on,
            cl.nombre AS customer,
            COALESCE(p.total, 0)::double precision AS total,
            COALESCE(p.pagado, false) AS paid,
            COALESCE(p.entregado, false) AS delivered
        FROM pedido p
        LEFT JOIN cliente cl ON cl.ci = p.ci_cliente
        WHERE p.fecha_pedido::date BETWEEN $1 AND $2
        ORDER BY p.fecha_pedido DESC, p.id DESC
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(conn)
    .await
}
