//! Unit tests for health check convergence

#[cfg(test)]
mod tests {
    use crate::reconciler::health_check::{remove, sync};
    use crate::test_utils::*;
    use ah_client::mock::helpers;
    use ah_client::{AhError, MockCall, MockLoadBalancersClient};

    fn seed_with_check(mock: &MockLoadBalancersClient, port: u16) {
        let mut lb = helpers::load_balancer("lb-web", "web");
        lb.health_checks = vec![helpers::health_check_from_request("hc-web", &health_policy(port))];
        mock.add_load_balancer(lb);
    }

    #[tokio::test]
    async fn test_enable_creates_check() {
        let mock = MockLoadBalancersClient::new("http://mock");
        let lb = seed_load_balancer(&mock, "lb-web", "web", &[], &[]);
        let test = TestContext::new(&mock);

        sync(&test.ctx(), &lb, &health_policy(30080)).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0], MockCall::CreateHealthCheck { lb_id: "lb-web".to_string() });
        assert!(matches!(calls[1], MockCall::GetHealthCheck { .. }));
        let checks = mock.load_balancer("lb-web").unwrap().health_checks;
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].port, 30080);
        assert_eq!(checks[0].state, "active");
    }

    #[tokio::test]
    async fn test_identical_policy_makes_no_call() {
        let mock = MockLoadBalancersClient::new("http://mock");
        seed_with_check(&mock, 30080);
        let lb = mock.load_balancer("lb-web").unwrap();
        let test = TestContext::new(&mock);

        sync(&test.ctx(), &lb, &health_policy(30080)).await.unwrap();

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_changed_policy_updates_in_place() {
        let mock = MockLoadBalancersClient::new("http://mock");
        seed_with_check(&mock, 30080);
        let lb = mock.load_balancer("lb-web").unwrap();
        let test = TestContext::new(&mock);

        let mut policy = health_policy(30080);
        policy.url = "/ready".to_string();
        sync(&test.ctx(), &lb, &policy).await.unwrap();

        assert_eq!(
            mock.mutation_calls(),
            vec![MockCall::UpdateHealthCheck {
                lb_id: "lb-web".to_string(),
                check_id: "hc-web".to_string(),
            }]
        );
        let checks = mock.load_balancer("lb-web").unwrap().health_checks;
        assert_eq!(checks[0].url, "/ready");
        assert_eq!(checks[0].state, "active");
    }

    #[tokio::test]
    async fn test_disable_deletes_check() {
        let mock = MockLoadBalancersClient::new("http://mock");
        seed_with_check(&mock, 30080);
        let lb = mock.load_balancer("lb-web").unwrap();
        let test = TestContext::new(&mock);

        remove(&test.ctx(), &lb).await.unwrap();

        assert_eq!(
            mock.mutation_calls(),
            vec![MockCall::DeleteHealthCheck {
                lb_id: "lb-web".to_string(),
                check_id: "hc-web".to_string(),
            }]
        );
        assert!(mock.load_balancer("lb-web").unwrap().health_checks.is_empty());
    }

    #[tokio::test]
    async fn test_disable_without_check_is_noop() {
        let mock = MockLoadBalancersClient::new("http://mock");
        let lb = seed_load_balancer(&mock, "lb-web", "web", &[], &[]);
        let test = TestContext::new(&mock);

        remove(&test.ctx(), &lb).await.unwrap();

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_not_found_counts_as_removed() {
        let mock = MockLoadBalancersClient::new("http://mock");
        seed_with_check(&mock, 30080);
        mock.fail_on("delete_health_check", || AhError::NotFound("gone".to_string()));
        let lb = mock.load_balancer("lb-web").unwrap();
        let test = TestContext::new(&mock);

        remove(&test.ctx(), &lb).await.unwrap();

        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_enable_disable_round_trip() {
        let mock = MockLoadBalancersClient::new("http://mock");
        seed_load_balancer(&mock, "lb-web", "web", &[], &[]);
        let test = TestContext::new(&mock);

        let lb = mock.load_balancer("lb-web").unwrap();
        sync(&test.ctx(), &lb, &health_policy(30080)).await.unwrap();
        let lb = mock.load_balancer("lb-web").unwrap();
        remove(&test.ctx(), &lb).await.unwrap();
        let lb = mock.load_balancer("lb-web").unwrap();
        assert!(lb.health_checks.is_empty());

        sync(&test.ctx(), &lb, &health_policy(30080)).await.unwrap();
        let lb = mock.load_balancer("lb-web").unwrap();
        assert_eq!(lb.health_checks.len(), 1);

        mock.clear_calls();
        sync(&test.ctx(), &lb, &health_policy(30080)).await.unwrap();
        assert!(mock.calls().is_empty());
    }
}
