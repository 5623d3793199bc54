//! Query helpers shared by the PostgreSQL repositories.

use std::str::FromStr;

use brokerdesk_application::{PageRequest, SortOrder};
use brokerdesk_core::{AppError, AppResult};
use brokerdesk_domain::stale_version;
use sqlx::{Postgres, QueryBuilder};

/// Maps a failed write, turning unique violations into conflicts and foreign
/// key violations into validation errors.
pub(crate) fn write_error(
    error: sqlx::Error,
    operation: &str,
    conflict_message: impl FnOnce() -> String,
) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some("23505") => return AppError::Conflict(conflict_message()),
            Some("23503") => {
                return AppError::Validation(format!(
                    "failed to {operation}: a referenced record does not exist or is still in use{}",
                    database_error
                        .constraint()
                        .map(|constraint| format!(" ({constraint})"))
                        .unwrap_or_default()
                ));
            }
            _ => {}
        }
    }

    AppError::Internal(format!("failed to {operation}: {error}"))
}

/// Builds a mapper for read failures.
pub(crate) fn read_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |error| AppError::Internal(format!("failed to {operation}: {error}"))
}

/// Parses a stored code column.
pub(crate) fn parse_stored<T>(value: &str, column: &str) -> AppResult<T>
where
    T: FromStr<Err = AppError>,
{
    T::from_str(value).map_err(|error| {
        AppError::Internal(format!("invalid stored {column} '{value}': {error}"))
    })
}

/// Fails with a row-version conflict when an optimistic write touched no row.
pub(crate) fn ensure_written(rows_affected: u64, entity_type: &str, id: &str) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(stale_version(entity_type, id));
    }

    Ok(())
}

/// Appends `ORDER BY` using the SQL expression mapped to the sort field, then
/// the tie-break expression in the same direction.
pub(crate) fn push_order_by(
    builder: &mut QueryBuilder<'_, Postgres>,
    sort: SortOrder,
    columns: &[(&str, &'static str)],
    tie_break: &'static str,
) {
    let direction = if sort.descending { " DESC" } else { " ASC" };
    let expression = columns
        .iter()
        .find(|(field, _)| *field == sort.field)
        .map(|(_, expression)| *expression)
        .unwrap_or(tie_break);

    builder.push(" ORDER BY ");
    builder.push(expression);
    builder.push(direction);
    builder.push(", ");
    builder.push(tie_break);
    builder.push(direction);
}

/// Appends `LIMIT` and `OFFSET` for a page request.
pub(crate) fn push_page(
    builder: &mut QueryBuilder<'_, Postgres>,
    page: PageRequest,
) -> AppResult<()> {
    let offset = i64::try_from(page.offset())
        .map_err(|error| AppError::Validation(format!("invalid page offset: {error}")))?;

    builder.push(" LIMIT ");
    builder.push_bind(i64::from(page.page_size()));
    builder.push(" OFFSET ");
    builder.push_bind(offset);
    Ok(())
}

/// Converts a `COUNT(*)` result.
pub(crate) fn count_to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn escape_like(search: &str) -> String {
    search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Builds an `ILIKE` pattern matching `search` anywhere, with wildcards escaped.
pub(crate) fn contains_pattern(search: &str) -> String {
    format!("%{}%", escape_like(search))
}

/// Builds an `ILIKE` pattern matching values starting with `search`.
pub(crate) fn prefix_pattern(search: &str) -> String {
    format!("{}%", escape_like(search))
}

/// Returns the trimmed search term, or `None` when blank.
pub(crate) fn search_term(search: Option<&String>) -> Option<&str> {
    search
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use brokerdesk_application::{PageRequest, SortOrder};
    use sqlx::{Postgres, QueryBuilder};

    use super::{contains_pattern, prefix_pattern, push_order_by, push_page, search_term};

    #[test]
    fn pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(" 50%_off "), "%50\\%\\_off%");
        assert_eq!(prefix_pattern("CH-01"), "CH-01%");
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_term(Some(&"   ".to_owned())), None);
        assert_eq!(search_term(None), None);
    }

    #[test]
    fn order_by_uses_mapped_expression_and_tie_break() {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT 1");
        push_order_by(
            &mut builder,
            SortOrder::desc("lastName"),
            &[("lastName", "lower(c.last_name)")],
            "c.id",
        );
        assert_eq!(
            builder.sql(),
            "SELECT 1 ORDER BY lower(c.last_name) DESC, c.id DESC"
        );
    }

    #[test]
    fn page_appends_limit_and_offset_binds() {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT 1");
        let pushed = push_page(&mut builder, PageRequest::new(Some(3), Some(25)));
        assert!(pushed.is_ok());
        assert_eq!(builder.sql(), "SELECT 1 LIMIT $1 OFFSET $2");
    }
}
