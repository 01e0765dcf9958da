//! Host function shims installed per window.
//!
//! Each shim is a set of interception hooks. They are installed when a window
//! is created (or when a window gets its first private tab), removed when the
//! window goes away, and force-removed when the engine is destroyed.

use super::host::{Host, ShimTarget};
use super::scheduler::{Scheduler, TaskId};
use crate::entity::{TabId, WindowId};
use crate::interception::{
    AfterHook, BeforeHook, BeforeOutcome, HookId, HostFn, Interceptor, MethodHost, MethodOverride,
    OverrideSlot,
};
use serde_json::Value;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

pub const SET_EFFECT_ALLOWED: &str = "set_effect_allowed_for_data_transfer";
pub const SWAP_BROWSERS: &str = "swap_browsers_and_close_other";
pub const WARN_ABOUT_CLOSING_WINDOW: &str = "warn_about_closing_window";
pub const IS_WINDOW_PRIVATE: &str = "is_window_private";
pub const SHOULD_CAPTURE: &str = "should_capture";
/// Called as `[tab_id, uri, {"from_external": bool}]`
pub const LOAD_URI: &str = "load_uri_with_flags";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShimKind {
    /// Let tabs be dragged between private and non-private windows
    TabDragBetweenWindows,
    /// Don't warn about closing a "private window" that merely holds private tabs
    CloseWindowWarning,
    /// Never capture thumbnails of private content
    ThumbnailCapture,
    /// Divert loads from external applications out of private tabs
    ExternalLinkDiversion,
}

impl ShimKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ShimKind::TabDragBetweenWindows => "tab drag between windows",
            ShimKind::CloseWindowWarning => "close window warning",
            ShimKind::ThumbnailCapture => "thumbnail capture",
            ShimKind::ExternalLinkDiversion => "external link diversion",
        }
    }
}

struct InstalledHook {
    target: Rc<dyn MethodHost>,
    method: &'static str,
    hook: HookId,
}

pub(super) struct ShimContext<'a> {
    pub host: &'a Rc<dyn Host>,
    pub interceptor: &'a Interceptor,
    pub scheduler: &'a Scheduler,
}

#[derive(Default)]
pub(super) struct ShimSet {
    installed: HashMap<(WindowId, ShimKind), Vec<InstalledHook>>,
    /// Every object ever patched, keyed by target key; teardown sweeps them
    touched: HashMap<String, Rc<dyn MethodHost>>,
}

impl ShimSet {
    pub(super) fn is_installed(&self, window: WindowId, kind: ShimKind) -> bool {
        self.installed.contains_key(&(window, kind))
    }

    /// Install a shim. Returns `false` when the host lacks every target method;
    /// the shim is then disabled for this window.
    pub(super) fn install(&mut self, ctx: &ShimContext<'_>, window: WindowId, kind: ShimKind) -> bool {
        if self.is_installed(window, kind) {
            return true;
        }

        let hooks = match kind {
            ShimKind::TabDragBetweenWindows => privacy_override(
                ctx,
                window,
                true,
                &[
                    (ShimTarget::TabStrip(window), SET_EFFECT_ALLOWED),
                    (ShimTarget::TabBrowser(window), SWAP_BROWSERS),
                ],
            ),
            ShimKind::CloseWindowWarning => privacy_override(
                ctx,
                window,
                false,
                &[(ShimTarget::Window(window), WARN_ABOUT_CLOSING_WINDOW)],
            ),
            ShimKind::ThumbnailCapture => thumbnail_capture(ctx, window),
            ShimKind::ExternalLinkDiversion => external_link_diversion(ctx, window),
        };

        if hooks.is_empty() {
            log::warn!(
                "Shim '{}' disabled for {}: host has no target to patch",
                kind.display_name(),
                window
            );
            return false;
        }
        log::debug!("Installed shim '{}' for {}", kind.display_name(), window);
        for hook in &hooks {
            self.touched
                .entry(hook.target.target_key().to_string())
                .or_insert_with(|| Rc::clone(&hook.target));
        }
        self.installed.insert((window, kind), hooks);
        true
    }

    pub(super) fn remove(&mut self, interceptor: &Interceptor, window: WindowId, kind: ShimKind, force: bool) {
        let Some(hooks) = self.installed.remove(&(window, kind)) else {
            return;
        };
        for hook in hooks {
            interceptor.unwrap(hook.target.as_ref(), hook.method, hook.hook, force);
        }
        log::debug!("Removed shim '{}' from {}", kind.display_name(), window);
    }

    pub(super) fn remove_window(&mut self, interceptor: &Interceptor, window: WindowId, force: bool) {
        let kinds: Vec<ShimKind> = self
            .installed
            .keys()
            .filter(|(w, _)| *w == window)
            .map(|(_, kind)| *kind)
            .collect();
        for kind in kinds {
            self.remove(interceptor, window, kind, force);
        }
        self.touched
            .retain(|_, target| interceptor.wraps_target(&**target));
    }

    /// Force-remove every shim, including pass-through wrappers left behind by
    /// earlier non-forced removals
    pub(super) fn remove_all(&mut self, interceptor: &Interceptor) {
        self.installed.clear();
        let touched: Vec<Rc<dyn MethodHost>> = self.touched.drain().map(|(_, t)| t).collect();
        let targets: Vec<&dyn MethodHost> = touched.iter().map(|t| t.as_ref()).collect();
        interceptor.unwrap_all(&targets);
        log::debug!("Removed all shims from {} host object(s)", targets.len());
    }
}

fn wrap_each(
    ctx: &ShimContext<'_>,
    targets: &[(ShimTarget, &'static str)],
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
) -> Vec<InstalledHook> {
    let mut installed = Vec::new();
    for (shim_target, method) in targets {
        let Some(target) = ctx.host.shim_target(*shim_target) else {
            log::warn!("Can't find {:?} to patch {}()", shim_target, method);
            continue;
        };
        match ctx
            .interceptor
            .wrap(target.as_ref(), method, before.clone(), after.clone())
        {
            Ok(hook) => installed.push(InstalledHook {
                target,
                method,
                hook,
            }),
            Err(e) => log::warn!("{}", e),
        }
    }
    installed
}

/// While a wrapped method runs, the window's privacy query answers `forced`.
///
/// Calls may nest (a shimmed method calling another one); the query stays
/// faked until the outermost call returns. If a call never returns normally
/// the zero-delay fallback task restores it on the next turn.
fn privacy_override(
    ctx: &ShimContext<'_>,
    window: WindowId,
    forced: bool,
    targets: &[(ShimTarget, &'static str)],
) -> Vec<InstalledHook> {
    let Some(utils) = ctx.host.shim_target(ShimTarget::PrivacyUtils(window)) else {
        log::warn!("Can't find privacy utils of {}", window);
        return Vec::new();
    };

    let slot = OverrideSlot::new();
    let fallback: Rc<Cell<Option<TaskId>>> = Rc::new(Cell::new(None));
    let scheduler = ctx.scheduler.clone();

    let before: BeforeHook = {
        let slot = slot.clone();
        Rc::new(move |_args: &[Value]| {
            let install = || {
                let fake: HostFn = Rc::new(move |_: &[Value]| Value::Bool(forced));
                MethodOverride::install(Rc::clone(&utils), IS_WINDOW_PRIVATE, fake)
            };
            if let Err(e) = slot.enter(install) {
                log::warn!("{}", e);
            }
            if let Some(previous) = fallback.take() {
                scheduler.cancel(previous);
            }
            let pending = slot.clone();
            fallback.set(Some(scheduler.schedule(0, move |_| {
                if pending.release() {
                    log::debug!("Restored privacy query after timeout");
                }
            })));
            BeforeOutcome::Continue
        })
    };
    let after: AfterHook = Rc::new(move |_ret: &Value, _args: &[Value]| {
        slot.leave();
        None
    });

    wrap_each(ctx, targets, Some(before), Some(after))
}

fn selected_is_private(host: &Weak<dyn Host>, window: WindowId) -> bool {
    let Some(host) = host.upgrade() else {
        return false;
    };
    host.selected_tab(window)
        .and_then(|tab| host.live_privacy(tab))
        .unwrap_or(false)
}

fn thumbnail_capture(ctx: &ShimContext<'_>, window: WindowId) -> Vec<InstalledHook> {
    let host = Rc::downgrade(ctx.host);
    let before: BeforeHook = Rc::new(move |_args: &[Value]| {
        if selected_is_private(&host, window) {
            log::debug!("Forbid thumbnail capture in {}", window);
            BeforeOutcome::ShortCircuit(Value::Bool(false))
        } else {
            BeforeOutcome::Continue
        }
    });
    wrap_each(
        ctx,
        &[(ShimTarget::Thumbnails(window), SHOULD_CAPTURE)],
        Some(before),
        None,
    )
}

fn external_link_diversion(ctx: &ShimContext<'_>, window: WindowId) -> Vec<InstalledHook> {
    let host = Rc::downgrade(ctx.host);
    let scheduler = ctx.scheduler.clone();
    let before: BeforeHook = Rc::new(move |args: &[Value]| {
        let from_external = args
            .get(2)
            .and_then(|flags| flags.get("from_external"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !from_external {
            return BeforeOutcome::Continue;
        }
        let Some(tab) = args.first().and_then(Value::as_u64).map(TabId) else {
            return BeforeOutcome::Continue;
        };
        let is_private = host
            .upgrade()
            .and_then(|host| host.live_privacy(tab))
            .unwrap_or(false);
        if !is_private {
            return BeforeOutcome::Continue;
        }
        let uri = args
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or("about:blank")
            .to_string();
        log::info!("External load into private {} => open in new tab", tab);
        scheduler.schedule(0, move |engine| engine.divert_external_load(window, &uri));
        BeforeOutcome::ShortCircuit(Value::Bool(true))
    });
    wrap_each(
        ctx,
        &[(ShimTarget::ContentLoader(window), LOAD_URI)],
        Some(before),
        None,
    )
}
