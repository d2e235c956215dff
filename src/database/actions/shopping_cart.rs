use crate::{
    authentication::permissions::ActionType, error::ApiError, jwt::SessionData,
    schema::{ShoppingListRow, Uuid},
};

use sqlx::{Pool, Postgres};

/// Sums every ingredient of the recipes in the user's cart, one row per
/// (name, measurement unit).
pub async fn shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListRow>, ApiError> {
    let rows: Vec<ShoppingListRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit,
            SUM(ri.amount)::BIGINT AS total_amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.customer_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub fn render_shopping_list(rows: &[ShoppingListRow]) -> String {
    if rows.is_empty() {
        return String::from("Shopping list is empty.\n");
    }

    let mut output = String::from("Shopping list:\n");
    for (index, row) in rows.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} ({}) - {}\n",
            index + 1,
            row.name,
            row.measurement_unit,
            row.total_amount
        ));
    }
    output
}

pub async fn download_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let rows = shopping_list(session.user_id, pool).await?;
    log::info!(
        "{} downloaded a shopping list of {} items",
        session.username,
        rows.len()
    );
    Ok(render_shopping_list(&rows))
}
