// Candidate HTTP paths, grouped by the framework family that usually serves them

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// Generic paths only
    Quick,
    /// Every family in the catalog
    Comprehensive,
}

impl RouteMode {
    pub fn paths(self) -> &'static [&'static str] {
        match self {
            RouteMode::Quick => QUICK_PATHS,
            RouteMode::Comprehensive => COMPREHENSIVE_PATHS.as_slice(),
        }
    }
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMode::Quick => write!(f, "quick"),
            RouteMode::Comprehensive => write!(f, "comprehensive"),
        }
    }
}

/// Generic paths, requested in quick mode.
pub const QUICK_PATHS: &[&str] = &[
    "/", "/api", "/api/v1", "/api/v2", "/health", "/status", "/metrics", "/swagger", "/docs",
    "/graphql", "/admin", "/login", "/register", "/dashboard", "/home", "/about", "/.well-known",
    "/robots.txt", "/sitemap.xml", "/favicon.ico",
];

pub const FRAMEWORK_PATHS: &[(&str, &[&str])] = &[
    ("common", QUICK_PATHS),
    (
        "flask",
        &[
            "/static", "/_debug", "/api/health", "/flask-admin", "/admin/static", "/debug",
            "/blueprint", "/ping", "/info", "/version", "/api/status", "/api/info", "/api/ping",
            "/api/version", "/api/docs", "/api/spec", "/api/swagger", "/routes",
        ],
    ),
    (
        "django",
        &[
            "/django-admin", "/static", "/media", "/admin/login", "/api-auth", "/api/schema",
            "/dj-rest-auth", "/accounts",
        ],
    ),
    (
        "fastapi",
        &[
            "/docs", "/redoc", "/openapi.json", "/api/docs", "/health", "/metrics", "/status",
            "/api/v1/health",
        ],
    ),
    (
        "express",
        &[
            "/api", "/users", "/auth", "/public", "/assets", "/socket.io", "/webpack-dev-server",
            "/hmr", "/api/health", "/api/status", "/api/info", "/api/version", "/routes",
        ],
    ),
    (
        "rails",
        &[
            "/rails/info", "/rails/mailers", "/assets", "/admin", "/api/v1", "/users",
            "/sessions", "/devise",
        ],
    ),
    (
        "laravel",
        &[
            "/api", "/admin", "/telescope", "/horizon", "/nova", "/broadcasting/auth",
            "/sanctum", "/passport",
        ],
    ),
    (
        "gin",
        &["/ping", "/health", "/metrics", "/api/v1", "/swagger", "/debug/pprof", "/static"],
    ),
    (
        "gorilla",
        &["/api", "/health", "/metrics", "/static", "/ws", "/websocket", "/debug"],
    ),
    (
        "fiber",
        &["/api", "/health", "/metrics", "/swagger", "/static", "/ws", "/monitor"],
    ),
    (
        "spring",
        &[
            "/actuator", "/actuator/health", "/actuator/metrics", "/actuator/info", "/api",
            "/swagger-ui", "/h2-console",
        ],
    ),
    (
        "quarkus",
        &[
            "/q/health", "/q/metrics", "/q/openapi", "/q/swagger-ui", "/q/dev", "/api",
            "/health/live", "/health/ready",
        ],
    ),
    (
        "ollama",
        &[
            "/api/tags", "/api/generate", "/api/chat", "/api/embeddings", "/api/create",
            "/api/show", "/api/copy", "/api/delete", "/api/pull", "/api/push", "/api/version",
            "/v1/chat/completions",
        ],
    ),
    (
        "jupyter",
        &[
            "/api", "/api/kernels", "/api/sessions", "/api/contents", "/tree", "/notebooks",
            "/terminals", "/lab", "/static",
        ],
    ),
    (
        "vscode",
        &["/vscode-remote-resource", "/$vscode-remote", "/static", "/workbench", "/api"],
    ),
    (
        "streamlit",
        &["/_stcore", "/healthz", "/static", "/media", "/_stcore/health", "/_stcore/stream"],
    ),
    (
        "gradio",
        &[
            "/api", "/api/predict", "/queue/join", "/queue/data", "/static", "/file", "/upload",
            "/component_server",
        ],
    ),
    (
        "nginx",
        &["/nginx_status", "/status", "/server-status", "/server-info", "/stats"],
    ),
    (
        "apache",
        &["/server-status", "/server-info", "/stats", "/cgi-bin", "/icons"],
    ),
    (
        "dev_servers",
        &[
            "/webpack-dev-server", "/__webpack_dev_server__", "/sockjs-node", "/__dev__",
            "/hot-update", "/hmr", "/__vite_ping", "/__vite_client",
        ],
    ),
];

lazy_static::lazy_static! {
    /// Every family flattened in catalog order, first occurrence kept.
    pub static ref COMPREHENSIVE_PATHS: Vec<&'static str> = {
        let mut seen = HashSet::new();
        FRAMEWORK_PATHS
            .iter()
            .flat_map(|(_, paths)| paths.iter().copied())
            .filter(|path| seen.insert(*path))
            .collect()
    };
}
