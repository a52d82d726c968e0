//! Resolving which module a subdomain carries.

use crate::context::HostContext;
use crate::module::Module;
use anyhow::Result;
use std::path::Path;
use svcmgr_core::{ModuleKind, ModuleMarker};
use tracing::debug;

/// The module recorded in `root_dir/.module`, or `NoModule` when there is no marker or
/// it names an unknown type.
pub fn load_bound_module(ctx: &HostContext, fqdn: &str, root_dir: &Path) -> Result<Module> {
    let marker = ModuleMarker::in_dir(root_dir);
    let recorded = marker.read_name()?;
    let kind = recorded
        .as_deref()
        .map_or(ModuleKind::NoModule, ModuleKind::parse_or_none);
    if let (Some(name), true) = (&recorded, kind.is_none()) {
        debug!("{} records unknown module type {:?}", marker.path().display(), name);
    }
    Module::materialize(ctx, kind, fqdn, root_dir)
}

/// A new module of type `type_name`; unknown names yield `NoModule` instead of an error.
pub fn create_module(ctx: &HostContext, type_name: &str, fqdn: &str, root_dir: &Path) -> Result<Module> {
    let kind = ModuleKind::parse_or_none(type_name);
    if kind.is_none() {
        debug!("Unknown module type {:?}, using NoModule", type_name);
    }
    Module::materialize(ctx, kind, fqdn, root_dir)
}
