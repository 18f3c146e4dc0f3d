// Groups services that look like redundant instances of the same thing

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::scanner::results::{DuplicateGroup, GroupKey, RouteDiscovery, ServiceRecord};

const FINGERPRINT_LEN: usize = 8;

/// Reduces variants such as `/usr/bin/Python3`, `python3.exe` and `python3`
/// to one spelling.
pub fn normalize_process_name(name: &str) -> String {
    let base = name
        .trim()
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match base.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => base,
    }
}

/// Short hash over the `Server` and `X-Powered-By` headers and the sorted
/// route set. `None` for ports that never answered HTTP.
pub fn fingerprint(routes: &RouteDiscovery) -> Option<String> {
    if !routes.speaks_http() {
        return None;
    }
    let mut paths = routes.paths();
    paths.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(routes.header("server").unwrap_or_default());
    hasher.update(routes.header("x-powered-by").unwrap_or_default());
    hasher.update(paths.join(","));
    let digest = format!("{:x}", hasher.finalize());
    Some(digest[..FINGERPRINT_LEN].to_string())
}

/// Partitions records by (process, framework) and returns every partition
/// with two or more members. Records without a process name are left out so
/// unrelated "Unknown" services never merge. Members and groups follow port
/// order.
pub fn find_duplicates(records: &[ServiceRecord]) -> Vec<DuplicateGroup> {
    let mut ordered: Vec<&ServiceRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.port());

    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for record in ordered {
        let Some(name) = record.process_name() else {
            continue;
        };
        let process = normalize_process_name(name);
        if process.is_empty() {
            continue;
        }

        let key = GroupKey {
            process,
            framework: record.framework.clone(),
        };
        match index.get(&key) {
            Some(&i) => groups[i].members.push(record.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup {
                    key,
                    members: vec![record.clone()],
                    shared_fingerprint: None,
                });
            }
        }
    }

    groups.retain(|g| g.members.len() >= 2);
    for group in &mut groups {
        group.shared_fingerprint = shared_fingerprint(&group.members);
    }
    groups
}

fn shared_fingerprint(members: &[ServiceRecord]) -> Option<String> {
    let first = members.first()?.fingerprint.as_ref()?;
    members
        .iter()
        .all(|m| m.fingerprint.as_ref() == Some(first))
        .then(|| first.clone())
}
