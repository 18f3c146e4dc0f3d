//! Framework classification.
//!
//! An ordered rule table is evaluated top to bottom and the first matching
//! rule names the framework. Specific signatures (route sets, headers, body
//! markers) sit above generic process-name fallbacks, so a Python process
//! serving `/docs` and `/redoc` is "FastAPI" rather than "Python app".

use std::collections::BTreeMap;

use regex::Regex;

use crate::scanner::results::{RouteDiscovery, UNKNOWN_FRAMEWORK};

/// Everything a rule may look at.
#[derive(Debug, Default, Clone)]
pub struct ClassifierInput<'a> {
    /// Lowercased process name
    process_name: Option<String>,
    paths: Vec<&'a str>,
    headers: Option<&'a BTreeMap<String, String>>,
    body: Option<&'a str>,
}

impl<'a> ClassifierInput<'a> {
    pub fn new(process_name: Option<&str>, routes: &'a RouteDiscovery) -> Self {
        Self {
            process_name: process_name.map(|n| n.to_lowercase()),
            paths: routes.paths(),
            headers: Some(&routes.headers),
            body: routes.body_snippet.as_deref(),
        }
    }

    pub fn from_parts(process_name: Option<&str>, paths: &[&'a str]) -> Self {
        Self {
            process_name: process_name.map(|n| n.to_lowercase()),
            paths: paths.to_vec(),
            ..Default::default()
        }
    }

    pub fn with_headers(mut self, headers: &'a BTreeMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_body(mut self, body: &'a str) -> Self {
        self.body = Some(body);
        self
    }

    fn has_path(&self, path: &str) -> bool {
        self.paths.iter().any(|p| *p == path)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .and_then(|h| h.get(name))
            .map(|v| v.as_str())
    }
}

#[derive(Debug)]
pub enum Matcher {
    /// Case-insensitive substring of the process name
    ProcessName(&'static str),
    /// Every listed path responded
    AllPaths(&'static [&'static str]),
    /// At least one listed path responded
    AnyPath(&'static [&'static str]),
    /// Baseline header (lowercase name) matches the pattern
    Header(&'static str, Regex),
    /// Baseline body snippet matches the pattern
    Body(Regex),
    /// Conjunction
    All(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, input: &ClassifierInput<'_>) -> bool {
        match self {
            Matcher::ProcessName(needle) => input
                .process_name
                .as_deref()
                .is_some_and(|name| name.contains(needle)),
            Matcher::AllPaths(paths) => paths.iter().all(|p| input.has_path(p)),
            Matcher::AnyPath(paths) => paths.iter().any(|p| input.has_path(p)),
            Matcher::Header(name, pattern) => {
                input.header(name).is_some_and(|value| pattern.is_match(value))
            }
            Matcher::Body(pattern) => input.body.is_some_and(|body| pattern.is_match(body)),
            Matcher::All(matchers) => matchers.iter().all(|m| m.matches(input)),
        }
    }
}

#[derive(Debug)]
pub struct FrameworkRule {
    pub label: &'static str,
    pub matcher: Matcher,
}

fn rule(label: &'static str, matcher: Matcher) -> FrameworkRule {
    FrameworkRule { label, matcher }
}

fn header(name: &'static str, pattern: &str) -> Matcher {
    Matcher::Header(name, case_insensitive(pattern))
}

fn body(pattern: &str) -> Matcher {
    Matcher::Body(case_insensitive(pattern))
}

fn case_insensitive(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).unwrap()
}

lazy_static::lazy_static! {
    pub static ref FRAMEWORK_RULES: Vec<FrameworkRule> = vec![
        // AI / data tooling
        rule("Ollama", Matcher::AllPaths(&["/api/tags", "/api/version"])),
        rule("Jupyter", Matcher::AllPaths(&["/api/kernels"])),
        rule("Streamlit", Matcher::AnyPath(&["/_stcore/health", "/_stcore"])),
        rule("Gradio", Matcher::AnyPath(&["/component_server"])),

        // Backend frameworks with unmistakable routes
        rule("Spring Boot", Matcher::AnyPath(&["/actuator/health", "/actuator"])),
        rule("Quarkus", Matcher::AnyPath(&["/q/health", "/q/dev"])),
        rule("Rails", Matcher::AnyPath(&["/rails/info", "/rails/mailers"])),
        rule("Laravel", Matcher::AnyPath(&["/telescope", "/horizon", "/nova"])),
        rule("Django", Matcher::AnyPath(&["/django-admin", "/dj-rest-auth", "/api-auth"])),
        rule("Django", Matcher::All(vec![
            Matcher::ProcessName("python"),
            Matcher::AllPaths(&["/admin/login"]),
        ])),
        rule("FastAPI", Matcher::AllPaths(&["/openapi.json", "/docs"])),
        rule("FastAPI", Matcher::AllPaths(&["/docs", "/redoc"])),
        rule("Flask", header("server", r"^werkzeug")),
        rule("Django", header("server", r"^wsgiserver")),
        rule("Uvicorn (ASGI)", header("server", r"^uvicorn")),

        // Frontend dev servers
        rule("Next.js", header("x-powered-by", r"next\.js")),
        rule("Next.js", body(r"__NEXT_DATA__|/_next/static")),
        rule("Nuxt", body(r"__NUXT__|/_nuxt/")),
        rule("Vite dev server", Matcher::AnyPath(&["/__vite_ping"])),
        rule("Vite dev server", body(r"/@vite/client")),
        rule("Webpack dev server", Matcher::AnyPath(&[
            "/webpack-dev-server",
            "/__webpack_dev_server__",
            "/sockjs-node",
        ])),
        rule("Express", header("x-powered-by", r"^express")),
        rule("VS Code Server", Matcher::AnyPath(&["/vscode-remote-resource"])),
        rule("VS Code Server", Matcher::ProcessName("code-server")),

        // Web servers
        rule("PHP app", header("x-powered-by", r"^php")),
        rule("nginx", header("server", r"^nginx")),
        rule("Apache httpd", header("server", r"^apache")),
        rule("Caddy", header("server", r"^caddy")),

        // Databases and daemons, by process
        rule("PostgreSQL", Matcher::ProcessName("postgres")),
        rule("MariaDB", Matcher::ProcessName("mariadb")),
        rule("MySQL", Matcher::ProcessName("mysqld")),
        rule("Redis", Matcher::ProcessName("redis-server")),
        rule("MongoDB", Matcher::ProcessName("mongod")),
        rule("Ollama", Matcher::ProcessName("ollama")),
        rule("Docker proxy", Matcher::ProcessName("docker")),

        // Runtimes
        rule("Node.js app", Matcher::ProcessName("node")),
        rule("Deno app", Matcher::ProcessName("deno")),
        rule("Python app", Matcher::ProcessName("python")),
        rule("Java app", Matcher::ProcessName("java")),
        rule("Ruby app", Matcher::ProcessName("ruby")),
        rule("PHP app", Matcher::ProcessName("php")),
        rule(".NET app", Matcher::ProcessName("dotnet")),
    ];
}

/// First matching label from `rules`, or `None`.
pub fn classify_with<'r>(rules: &'r [FrameworkRule], input: &ClassifierInput<'_>) -> Option<&'r str> {
    rules
        .iter()
        .find(|rule| rule.matcher.matches(input))
        .map(|rule| rule.label)
}

/// Labels a service using the built-in rule table. Falls back to "Unknown".
pub fn classify(input: &ClassifierInput<'_>) -> String {
    classify_with(&FRAMEWORK_RULES, input)
        .unwrap_or(UNKNOWN_FRAMEWORK)
        .to_string()
}
