//! Optional per-client cache of the last fetched entities.
//!
//! Entries are written after successful calls and read opportunistically.
//! Each entity type has its own lock so unrelated fan-outs do not contend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::model::{Domain, EmailAccount, Package, User};

#[derive(Debug, Default)]
pub struct Cache {
    domains: Mutex<HashMap<String, Domain>>,
    email_accounts: Mutex<HashMap<String, Vec<EmailAccount>>>,
    packages: Mutex<HashMap<String, Package>>,
    users: Mutex<HashMap<String, User>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(&self, name: &str) -> Option<Domain> {
        lock(&self.domains).get(name).cloned()
    }

    pub fn store_domain(&self, domain: &Domain) {
        lock(&self.domains).insert(domain.domain.clone(), domain.clone());
    }

    pub fn remove_domain(&self, name: &str) {
        lock(&self.domains).remove(name);
    }

    /// Cached domains for `names`, or `None` if any one is missing.
    pub fn domains(&self, names: &[String]) -> Option<Vec<Domain>> {
        let domains = lock(&self.domains);
        names.iter().map(|name| domains.get(name).cloned()).collect()
    }

    /// Email accounts are cached per domain.
    pub fn email_accounts(&self, domain: &str) -> Option<Vec<EmailAccount>> {
        lock(&self.email_accounts).get(domain).cloned()
    }

    pub fn store_email_accounts(&self, domain: &str, accounts: &[EmailAccount]) {
        lock(&self.email_accounts).insert(domain.to_string(), accounts.to_vec());
    }

    pub fn package(&self, name: &str) -> Option<Package> {
        lock(&self.packages).get(name).cloned()
    }

    pub fn store_package(&self, package: &Package) {
        lock(&self.packages).insert(package.name.clone(), package.clone());
    }

    pub fn remove_package(&self, name: &str) {
        lock(&self.packages).remove(name);
    }

    pub fn user(&self, username: &str) -> Option<User> {
        lock(&self.users).get(username).cloned()
    }

    pub fn store_user(&self, user: &User) {
        lock(&self.users).insert(user.config.username.clone(), user.clone());
    }

    pub fn remove_user(&self, username: &str) {
        lock(&self.users).remove(username);
    }
}
