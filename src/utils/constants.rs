//! Shared constants and invariants

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_STORAGE_PATH: &str = ".civilens/session.json";

// Durable storage keys. Nothing else is ever persisted.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

// Auth endpoints
pub const AUTH_REGISTER_PATH: &str = "/auth/register/";
pub const AUTH_LOGIN_PATH: &str = "/auth/login/";
pub const AUTH_REFRESH_PATH: &str = "/auth/refresh/";
pub const AUTH_LOGOUT_PATH: &str = "/auth/logout/";
pub const AUTH_PROFILE_PATH: &str = "/auth/profile/";

// Cache groups
pub const GROUP_CHAT_MESSAGES: &str = "chatMessages";
pub const GROUP_DOCUMENTS: &str = "documents";
pub const GROUP_PROFILE: &str = "profile";
pub const GROUP_COMPLAINTS: &str = "complaints";
pub const GROUP_DISCUSSIONS: &str = "discussions";
pub const GROUP_SCHEMES: &str = "schemes";
pub const GROUP_REGIONS: &str = "regions";
pub const GROUP_ADMIN_USERS: &str = "adminUsers";

/// Groups holding per-account data. Purged whenever the identity changes.
pub const ACCOUNT_SCOPED_GROUPS: [&str; 5] = [
    GROUP_CHAT_MESSAGES,
    GROUP_DOCUMENTS,
    GROUP_PROFILE,
    GROUP_COMPLAINTS,
    GROUP_ADMIN_USERS,
];

pub const ANONYMOUS_ACCOUNT: &str = "anonymous";
