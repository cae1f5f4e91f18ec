//! Query utilities for the Advanced Hosting API
//!
//! List endpoints accept equality filters as `filters[<key>][eq]=<value>`.

use crate::common::HttpClient;
use crate::error::AhError;
use serde::Deserialize;

/// Build a list path with equality filters appended
pub fn list_path(http: &HttpClient, endpoint: &str, filters: &[(&str, &str)]) -> String {
    let path = format!("/api/v1/{}", endpoint);
    if filters.is_empty() {
        path
    } else {
        format!("{}?{}", path, http.build_query_string(filters))
    }
}

/// Query a list endpoint whose documents are wrapped in `collection_key`
pub async fn query_resources<T: for<'de> Deserialize<'de>>(
    http: &HttpClient,
    endpoint: &str,
    collection_key: &str,
    filters: &[(&str, &str)],
) -> Result<Vec<T>, AhError> {
    let path = list_path(http, endpoint, filters);
    http.get_wrapped(&path, collection_key).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_path_without_filters() {
        let http = HttpClient::new(reqwest::Client::new(), "https://api.websa.com/".to_string(), "t".to_string());
        assert_eq!(list_path(&http, "load_balancers", &[]), "/api/v1/load_balancers");
    }

    #[test]
    fn test_list_path_encodes_filters() {
        let http = HttpClient::new(reqwest::Client::new(), "https://api.websa.com".to_string(), "t".to_string());
        let path = list_path(&http, "load_balancers", &[("name", "my lb")]);
        assert_eq!(path, "/api/v1/load_balancers?filters%5Bname%5D%5Beq%5D=my%20lb");
    }
}
