use brokerdesk_application::{ListQuery, PageRequest, SortFields};
use brokerdesk_core::AppError;

pub mod accounts;
pub mod audit_logs;
pub mod auth;
pub mod clients;
pub mod entity_changes;
pub mod health;
pub mod instruments;
pub mod orders;
pub mod roles;
pub mod transactions;
pub mod users;

/// Validates the sort key and clamps the page of one listing call.
fn list_query<F>(
    fields: SortFields,
    sort: Option<&str>,
    page: Option<u32>,
    page_size: Option<u32>,
    filter: F,
) -> Result<ListQuery<F>, AppError> {
    Ok(ListQuery {
        filter,
        sort: fields.parse(sort)?,
        page: PageRequest::new(page, page_size),
    })
}

#[cfg(test)]
mod tests {
    use brokerdesk_application::{CLIENT_SORT_FIELDS, ClientFilter, SortOrder};
    use brokerdesk_core::AppError;

    use super::list_query;

    #[test]
    fn list_query_parses_descending_sort() {
        let query = list_query(
            CLIENT_SORT_FIELDS,
            Some("-email"),
            Some(2),
            Some(500),
            ClientFilter::default(),
        )
        .unwrap_or_else(|error| panic!("query should build: {error}"));

        assert_eq!(query.sort, SortOrder::desc("email"));
        assert_eq!(query.page.page(), 2);
        assert_eq!(query.page.page_size(), 100);
    }

    #[test]
    fn list_query_rejects_unknown_sort_field() {
        let result = list_query(
            CLIENT_SORT_FIELDS,
            Some("passwordHash"),
            None,
            None,
            ClientFilter::default(),
        );

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
