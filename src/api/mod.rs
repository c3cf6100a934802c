//! Backend resources. Records are opaque JSON; each function maps to one endpoint.

pub mod admin;
pub mod chat;
pub mod client;
pub mod complaints;
pub mod discussions;
pub mod documents;
pub mod health;
pub mod regions;
pub mod schemes;
pub mod sentiment;

/// Stable cache key part for a set of query parameters
pub(crate) fn params_key(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    pairs.sort();
    if pairs.is_empty() {
        "all".to_owned()
    } else {
        pairs.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::params_key;

    #[test]
    fn params_key_is_order_independent() {
        assert_eq!(params_key(&[]), "all");
        assert_eq!(
            params_key(&[("state", "KA"), ("category", "health")]),
            params_key(&[("category", "health"), ("state", "KA")])
        );
    }
}
