//! Forwarding rule and health check operations for MockLoadBalancersClient

use super::helpers;
use super::load_balancers::{with_active_load_balancer, with_load_balancer};
use super::MockLoadBalancersClient;
use crate::error::AhError;
use crate::models::*;

fn rule_not_found(lb_id: &str, rule_id: &str) -> AhError {
    AhError::NotFound(format!("Forwarding rule {} of load balancer {} not found", rule_id, lb_id))
}

fn check_not_found(lb_id: &str, check_id: &str) -> AhError {
    AhError::NotFound(format!("Health check {} of load balancer {} not found", check_id, lb_id))
}

pub fn create_forwarding_rule(
    client: &MockLoadBalancersClient,
    lb_id: &str,
    request: &ForwardingRuleCreateRequest,
) -> Result<ForwardingRule, AhError> {
    with_active_load_balancer(client, lb_id, |lb| {
        if lb.forwarding_rules.iter().any(|fr| fr.request_port == request.request_port) {
            return Err(AhError::InvalidRequest(format!(
                "Port {} is already forwarded",
                request.request_port
            )));
        }

        let id = client.next_id("fr");
        let mut rule = helpers::rule_from_request(&id, request);
        rule.state = client.begin_transition(&id, states::CREATING, states::ACTIVE);
        lb.forwarding_rules.push(rule.clone());
        Ok(rule)
    })
}

pub fn get_forwarding_rule(
    client: &MockLoadBalancersClient,
    lb_id: &str,
    rule_id: &str,
) -> Result<ForwardingRule, AhError> {
    with_load_balancer(client, lb_id, |lb| {
        let index = lb
            .forwarding_rules
            .iter()
            .position(|fr| fr.id == rule_id)
            .ok_or_else(|| rule_not_found(lb_id, rule_id))?;

        if client.observe(rule_id) {
            if lb.forwarding_rules[index].state == states::DELETING {
                lb.forwarding_rules.remove(index);
                return Err(rule_not_found(lb_id, rule_id));
            }
            lb.forwarding_rules[index].state = states::ACTIVE.to_string();
        }
        Ok(lb.forwarding_rules[index].clone())
    })
}

pub fn delete_forwarding_rule(client: &MockLoadBalancersClient, lb_id: &str, rule_id: &str) -> Result<(), AhError> {
    with_active_load_balancer(client, lb_id, |lb| {
        let index = lb
            .forwarding_rules
            .iter()
            .position(|fr| fr.id == rule_id)
            .ok_or_else(|| rule_not_found(lb_id, rule_id))?;

        if client.begin_transition(rule_id, states::DELETING, states::DELETED) == states::DELETED {
            lb.forwarding_rules.remove(index);
        } else {
            lb.forwarding_rules[index].state = states::DELETING.to_string();
        }
        Ok(())
    })
}

pub fn create_health_check(
    client: &MockLoadBalancersClient,
    lb_id: &str,
    request: &HealthCheckRequest,
) -> Result<HealthCheck, AhError> {
    with_active_load_balancer(client, lb_id, |lb| {
        if !lb.health_checks.is_empty() {
            return Err(AhError::InvalidRequest(format!(
                "Load balancer {} already has a health check",
                lb_id
            )));
        }

        let id = client.next_id("hc");
        let mut check = helpers::health_check_from_request(&id, request);
        check.state = client.begin_transition(&id, states::CREATING, states::ACTIVE);
        lb.health_checks.push(check.clone());
        Ok(check)
    })
}

pub fn get_health_check(client: &MockLoadBalancersClient, lb_id: &str, check_id: &str) -> Result<HealthCheck, AhError> {
    with_load_balancer(client, lb_id, |lb| {
        let index = lb
            .health_checks
            .iter()
            .position(|hc| hc.id == check_id)
            .ok_or_else(|| check_not_found(lb_id, check_id))?;

        if client.observe(check_id) {
            if lb.health_checks[index].state == states::DELETING {
                lb.health_checks.remove(index);
                return Err(check_not_found(lb_id, check_id));
            }
            lb.health_checks[index].state = states::ACTIVE.to_string();
        }
        Ok(lb.health_checks[index].clone())
    })
}

pub fn update_health_check(
    client: &MockLoadBalancersClient,
    lb_id: &str,
    check_id: &str,
    request: &HealthCheckRequest,
) -> Result<(), AhError> {
    with_active_load_balancer(client, lb_id, |lb| {
        let check = lb
            .health_checks
            .iter_mut()
            .find(|hc| hc.id == check_id)
            .ok_or_else(|| check_not_found(lb_id, check_id))?;

        let mut updated = helpers::health_check_from_request(check_id, request);
        updated.state = client.begin_transition(check_id, states::UPDATING, states::ACTIVE);
        *check = updated;
        Ok(())
    })
}

pub fn delete_health_check(client: &MockLoadBalancersClient, lb_id: &str, check_id: &str) -> Result<(), AhError> {
    with_active_load_balancer(client, lb_id, |lb| {
        let index = lb
            .health_checks
            .iter()
            .position(|hc| hc.id == check_id)
            .ok_or_else(|| check_not_found(lb_id, check_id))?;

        if client.begin_transition(check_id, states::DELETING, states::DELETED) == states::DELETED {
            lb.health_checks.remove(index);
        } else {
            lb.health_checks[index].state = states::DELETING.to_string();
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ah_trait::LoadBalancersApi;

    fn seeded() -> MockLoadBalancersClient {
        let client = MockLoadBalancersClient::new("http://mock");
        client.add_load_balancer(helpers::load_balancer("lb-1", "web"));
        client
    }

    #[tokio::test]
    async fn test_forwarding_rule_create_then_delete() {
        let client = seeded();
        let rule = client
            .create_forwarding_rule("lb-1", &helpers::rule_request("tcp", 80, "tcp", 30080))
            .await
            .unwrap();
        assert_eq!(rule.state, states::CREATING);
        assert_eq!(client.get_forwarding_rule("lb-1", &rule.id).await.unwrap().state, states::ACTIVE);

        client.delete_forwarding_rule("lb-1", &rule.id).await.unwrap();
        let err = client.get_forwarding_rule("lb-1", &rule.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(client.load_balancer("lb-1").unwrap().forwarding_rules.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_port_is_rejected() {
        let client = seeded();
        let request = helpers::rule_request("tcp", 80, "tcp", 30080);
        client.create_forwarding_rule("lb-1", &request).await.unwrap();
        assert!(client.create_forwarding_rule("lb-1", &request).await.is_err());
    }

    #[tokio::test]
    async fn test_health_check_is_a_singleton() {
        let client = seeded();
        let request = helpers::health_check_request(8080);
        client.create_health_check("lb-1", &request).await.unwrap();
        let err = client.create_health_check("lb-1", &request).await.unwrap_err();
        assert!(matches!(err, AhError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_health_check_update_applies_fields() {
        let client = seeded();
        let check = client
            .create_health_check("lb-1", &helpers::health_check_request(8080))
            .await
            .unwrap();
        client.get_health_check("lb-1", &check.id).await.unwrap();

        let mut request = helpers::health_check_request(8080);
        request.interval = 30;
        client.update_health_check("lb-1", &check.id, &request).await.unwrap();

        let fetched = client.get_health_check("lb-1", &check.id).await.unwrap();
        assert_eq!(fetched.interval, 30);
        assert_eq!(fetched.state, states::ACTIVE);
    }
}
