//! Integration tests for the Advanced Hosting client
//!
//! These tests require access to a real Advanced Hosting account.
//! Set AH_API_URL (optional) and AH_API_TOKEN environment variables to run.

use ah_client::{AhClient, AhError, LoadBalancersApi};

fn client() -> AhClient {
    let url = std::env::var("AH_API_URL")
        .unwrap_or_else(|_| "https://api.websa.com".to_string());
    let token = std::env::var("AH_API_TOKEN")
        .expect("AH_API_TOKEN environment variable must be set");

    AhClient::new(url, token).expect("Failed to create client")
}

#[tokio::test]
#[ignore] // Requires Advanced Hosting credentials
async fn test_list_load_balancers() {
    let lbs = client().list_load_balancers(&[]).await
        .expect("Failed to list load balancers");

    println!("Found {} load balancers", lbs.len());
}

#[tokio::test]
#[ignore]
async fn test_list_datacenters() {
    let datacenters = client().list_datacenters().await
        .expect("Failed to list datacenters");

    assert!(!datacenters.is_empty(), "Account should see at least one datacenter");
}

#[tokio::test]
#[ignore]
async fn test_unknown_load_balancer_is_not_found() {
    let result = client()
        .get_load_balancer("00000000-0000-0000-0000-000000000000")
        .await;

    assert!(matches!(result, Err(AhError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_bad_token_is_authentication_error() {
    let url = std::env::var("AH_API_URL")
        .unwrap_or_else(|_| "https://api.websa.com".to_string());
    let client = AhClient::new(url, "invalid-token".to_string()).expect("Failed to create client");

    let result = client.list_load_balancers(&[]).await;
    assert!(matches!(result, Err(AhError::Authentication(_))));
}
