use sqlx::PgConnection;

use crate::models::rows::ProductionBatchRow;
use crate::models::DateRange;

pub async fn fetch_batches(conn: &mut PgConnection, range: &DateRange) -> Result<Vec<ProductionBatchRow>, sqlx::Error> {
    sqlx::query_as::<_, ProductionBatchRow>(
        r#"
        SELECT
            pd.id::bigint AS id,
            pd.fecha::date AS day,
            COALESCE(pr.nombre, 'Sin producto') AS product,
            pd.descripcion AS description,
            COALESCE(pd.terminado, false) AS finished
        FROM produccion pd
        LEFT JOIN receta r ON r.id = pd.id_receta
        LEFT JOIN producto pr ON pr.id = r.id_producto
        WHERE pd.fecha::date BETWEEN $1 AND $2
        ORDER BY pd.fecha ASC, pd.id ASC
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(conn)
    .await
}
