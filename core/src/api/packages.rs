//! User packages (managed by resellers) and reseller packages (managed by
//! administrators). Both share one legacy command shape and differ only in
//! the command names and the package type.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::{fan_out, AdminContext, ResellerContext, UserContext};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpMethod;
use crate::model::{Package, RawPackage, RawResellerPackage, ResellerPackage};
use crate::transport::{Endpoint, Form};

use super::push_indexed;

#[derive(Clone, Copy)]
struct Commands {
    manage: &'static str,
    show: &'static str,
}

const USER_PACKAGES: Commands = Commands {
    manage: "MANAGE_USER_PACKAGES",
    show: "API_PACKAGES_USER",
};

const RESELLER_PACKAGES: Commands = Commands {
    manage: "MANAGE_RESELLER_PACKAGES",
    show: "API_PACKAGES_RESELLER",
};

impl UserContext {
    /// Create or overwrite a package. The panel has no separate update.
    fn save_package<R: Serialize>(&self, commands: Commands, raw: &R) -> Result<()> {
        let form = Form::from_serializable(raw)?;
        self.legacy_action(
            Endpoint::new(commands.manage).query("add", "yes"),
            &form,
            "save package",
            "Saved",
        )
    }

    fn delete_package_names(&self, commands: Commands, names: &[&str]) -> Result<()> {
        let mut form = Form::new().with("delete", "yes");
        for (index, name) in names.iter().enumerate() {
            form.push(format!("delete{index}"), *name);
        }
        push_indexed(&mut form, "select", names.iter().copied());
        self.legacy_action(commands.manage, &form, "delete package(s)", "Deleted")
    }

    fn fetch_package<R: DeserializeOwned>(&self, commands: Commands, name: &str) -> Result<R> {
        self.call_legacy(
            HttpMethod::Get,
            Endpoint::new(commands.show).query("package", name),
            None,
        )
        .with_context(|| format!("failed to get package info for {name}"))
    }

    fn list_package_names(&self, commands: Commands) -> Result<Vec<String>> {
        let names: Option<Vec<String>> = self.call_legacy(HttpMethod::Get, commands.show, None)?;
        match names {
            Some(names) if !names.is_empty() => Ok(names),
            _ => Err(Error::NotFound("packages")),
        }
    }

    fn rename_package_in(&self, commands: Commands, old_name: &str, new_name: &str) -> Result<()> {
        let form = Form::new()
            .with("old_package", old_name)
            .with("new_package", new_name);
        self.legacy_action(
            Endpoint::new(commands.manage).query("action", "rename"),
            &form,
            "rename package",
            "Saved",
        )
    }
}

impl ResellerContext {
    pub fn create_package(&self, package: &Package) -> Result<()> {
        self.save_package(USER_PACKAGES, &RawPackage::from(package))?;
        if let Some(cache) = self.cache() {
            cache.store_package(package);
        }
        Ok(())
    }

    pub fn delete_packages(&self, names: &[&str]) -> Result<()> {
        self.delete_package_names(USER_PACKAGES, names)?;
        if let Some(cache) = self.cache() {
            for name in names {
                cache.remove_package(name);
            }
        }
        Ok(())
    }

    pub fn get_package(&self, name: &str) -> Result<Package> {
        if let Some(package) = self.cache().and_then(|cache| cache.package(name)) {
            return Ok(package);
        }
        let mut raw: RawPackage = self.fetch_package(USER_PACKAGES, name)?;
        raw.name = name.to_string();
        let package = Package::from(raw);
        if let Some(cache) = self.cache() {
            cache.store_package(&package);
        }
        Ok(package)
    }

    /// Every package owned by this reseller, fetched concurrently.
    pub fn get_packages(&self) -> Result<Vec<Package>> {
        let names = self.list_package_names(USER_PACKAGES)?;
        fan_out(&names, |name| self.get_package(name))
    }

    pub fn rename_package(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.rename_package_in(USER_PACKAGES, old_name, new_name)?;
        if let Some(cache) = self.cache() {
            cache.remove_package(old_name);
        }
        Ok(())
    }

    pub fn update_package(&self, package: &Package) -> Result<()> {
        self.create_package(package)
    }
}

impl AdminContext {
    pub fn create_reseller_package(&self, package: &ResellerPackage) -> Result<()> {
        self.save_package(RESELLER_PACKAGES, &RawResellerPackage::from(package))
    }

    pub fn delete_reseller_packages(&self, names: &[&str]) -> Result<()> {
        self.delete_package_names(RESELLER_PACKAGES, names)
    }

    pub fn get_reseller_package(&self, name: &str) -> Result<ResellerPackage> {
        let mut raw: RawResellerPackage = self.fetch_package(RESELLER_PACKAGES, name)?;
        raw.package.name = name.to_string();
        Ok(raw.into())
    }

    pub fn get_reseller_packages(&self) -> Result<Vec<ResellerPackage>> {
        let names = self.list_package_names(RESELLER_PACKAGES)?;
        fan_out(&names, |name| self.get_reseller_package(name))
    }

    pub fn rename_reseller_package(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.rename_package_in(RESELLER_PACKAGES, old_name, new_name)
    }

    pub fn update_reseller_package(&self, package: &ResellerPackage) -> Result<()> {
        self.create_reseller_package(package)
    }
}
