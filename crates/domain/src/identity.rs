use sha2::{Digest, Sha256};
use std::fmt;

const SHORT_HASH_LEN: usize = 12;
const GUEST_HASH_LEN: usize = 16;

/// 计数去重时区分调用方的身份，在请求边界构造一次后按值传递
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Authenticated { user_id: i64 },
    Anonymous { ip_hash: String, ua_hash: String },
}

impl Identity {
    pub fn authenticated(user_id: i64) -> Self {
        Identity::Authenticated { user_id }
    }

    /// 匿名用户：IP + UA 指纹，同一网络下的不同设备分别计数
    pub fn anonymous(ip: &str, user_agent: &str) -> Self {
        let ip = if ip.trim().is_empty() { "unknown" } else { ip.trim() };
        Identity::Anonymous {
            ip_hash: short_hash(ip),
            ua_hash: short_hash(user_agent),
        }
    }

    pub fn resolve(user_id: Option<i64>, ip: &str, user_agent: &str) -> Self {
        match user_id {
            Some(id) => Self::authenticated(id),
            None => Self::anonymous(ip, user_agent),
        }
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Authenticated { user_id } => write!(f, "user:{}", user_id),
            Identity::Anonymous { ip_hash, ua_hash } => write!(f, "anon:{}:{}", ip_hash, ua_hash),
        }
    }
}

fn short_hash(raw: &str) -> String {
    let mut digest = hex::encode(Sha256::digest(raw.as_bytes()));
    digest.truncate(SHORT_HASH_LEN);
    digest
}

/// X-Forwarded-For 的第一个地址优先，其次是对端地址
pub fn client_ip(forwarded_for: Option<&str>, peer: Option<&str>) -> String {
    forwarded_for
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| peer.map(str::trim).filter(|ip| !ip.is_empty()))
        .unwrap_or("unknown")
        .to_string()
}

/// 游客评论时合成的用户名，同一 IP + 昵称映射到同一个游客账号
pub fn guest_username(ip: &str, guest_name: &str) -> String {
    let raw = format!("{}|{}", ip, guest_name);
    let mut digest = hex::encode(Sha256::digest(raw.as_bytes()));
    digest.truncate(GUEST_HASH_LEN);
    format!("guest_{}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_key() {
        assert_eq!(Identity::resolve(Some(3), "1.2.3.4", "ua").key(), "user:3");
    }

    #[test]
    fn test_anonymous_key_is_bounded_and_opaque() {
        let id = Identity::anonymous("203.0.113.9", "Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0");
        let key = id.key();
        assert!(key.starts_with("anon:"));
        assert!(!key.contains("203.0.113.9"));
        assert_eq!(key.len(), "anon:".len() + SHORT_HASH_LEN + 1 + SHORT_HASH_LEN);
    }

    #[test]
    fn test_devices_behind_same_ip_are_distinct() {
        let phone = Identity::anonymous("10.0.0.1", "phone");
        let laptop = Identity::anonymous("10.0.0.1", "laptop");
        assert_ne!(phone, laptop);
        assert_eq!(phone, Identity::anonymous("10.0.0.1", "phone"));
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        assert_eq!(
            client_ip(Some("198.51.100.7, 10.0.0.2"), Some("127.0.0.1")),
            "198.51.100.7"
        );
        assert_eq!(client_ip(Some("  "), Some("127.0.0.1")), "127.0.0.1");
        assert_eq!(client_ip(None, None), "unknown");
    }

    #[test]
    fn test_guest_username_is_stable() {
        let a = guest_username("1.1.1.1", "Ferris");
        assert_eq!(a, guest_username("1.1.1.1", "Ferris"));
        assert_ne!(a, guest_username("1.1.1.1", "Crab"));
        assert_eq!(a.len(), "guest_".len() + GUEST_HASH_LEN);
    }
}
