use std::collections::HashSet;

use sqlx::PgConnection;

use super::{error::ApiError, schema::Uuid};

pub mod collections;
pub mod ingredients;
pub mod recipes;
pub mod shopping_cart;
pub mod subscriptions;
pub mod tags;
pub mod users;

/// Ids from `ids` that have no row in `table`.
async fn find_missing(
    table: &'static str,
    ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<Vec<Uuid>, ApiError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let found: Vec<(Uuid,)> = sqlx::query_as(&format!("SELECT id FROM {table} WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;
    let found: HashSet<Uuid> = found.into_iter().map(|row| row.0).collect();

    Ok(ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect())
}

/// Escapes LIKE wildcards so user input only ever matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("egg"), "egg");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }
}
