use std::str::FromStr;

use super::policy::{Requirement, landing_route, normalize_path, paths};
use crate::error::Error;
use crate::session::SessionState;
use crate::types::Role;

/// Which rule set [`decide`] applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuardMode {
    /// Declared requirements only.
    #[default]
    Basic,
    /// Declared requirements, plus landing-route normalization of `/` and
    /// `/dashboard` and cross-role path-prefix blocking for signed-in users.
    Strict,
}

impl FromStr for GuardMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "strict" => Ok(Self::Strict),
            other => Err(Error::Config(format!("unknown guard mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    SignInRequired,
    Unauthorized,
    /// Strict mode only: sent to the role's landing route.
    Landing,
    /// A screen's input is gone (e.g. no risk result to show).
    MissingResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: &'static str,
    pub reason: RedirectReason,
}

impl Redirect {
    #[must_use]
    pub fn sign_in() -> Self {
        Self {
            target: paths::LOGIN,
            reason: RedirectReason::SignInRequired,
        }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self {
            target: paths::UNAUTHORIZED,
            reason: RedirectReason::Unauthorized,
        }
    }

    #[must_use]
    pub fn landing(role: &Role) -> Self {
        Self {
            target: landing_route(role),
            reason: RedirectReason::Landing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Session still resolving; show a placeholder and decide again later.
    Loading,
    Render,
    Redirect(Redirect),
}

/// Decide one navigation. Pure: no intent capture, no notifications.
///
/// Rules, first match wins:
/// 1. public route in basic mode renders
/// 2. session resolving → [`Decision::Loading`]
/// 3. signed out → sign-in (public routes render)
/// 4. single required role differs → unauthorized
/// 5. role outside a non-empty allowed set → unauthorized
/// 6. strict mode path rules
/// 7. render
#[must_use]
pub fn decide(
    mode: GuardMode,
    path: &str,
    requirement: &Requirement,
    state: &SessionState,
) -> Decision {
    if mode == GuardMode::Basic && requirement.is_public() {
        return Decision::Render;
    }

    let role = match state {
        SessionState::Resolving => return Decision::Loading,
        SessionState::SignedOut if requirement.is_public() => return Decision::Render,
        SessionState::SignedOut => return Decision::Redirect(Redirect::sign_in()),
        SessionState::SignedIn(session) => &session.identity.role,
    };

    match requirement {
        Requirement::Role(required) if required != role => {
            return Decision::Redirect(Redirect::unauthorized());
        }
        Requirement::AnyOf(allowed) if !allowed.is_empty() && !allowed.contains(role) => {
            return Decision::Redirect(Redirect::unauthorized());
        }
        _ => {}
    }

    if mode == GuardMode::Strict {
        if let Some(redirect) = strict_redirect(normalize_path(path), role) {
            return Decision::Redirect(redirect);
        }
    }

    Decision::Render
}

fn strict_redirect(path: &str, role: &Role) -> Option<Redirect> {
    if path == paths::HOME || path == paths::DASHBOARD {
        return Some(Redirect::landing(role));
    }
    match role {
        Role::Hospital if path.starts_with("/manufacturer") => Some(Redirect::landing(role)),
        Role::Manufacturer if path.starts_with("/medical") => Some(Redirect::landing(role)),
        Role::SuperAdmin => None,
        _ if path.starts_with("/super-admin") => Some(Redirect::unauthorized()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::policy::RoutePolicy;
    use crate::types::{Credential, Identity, Session};

    fn signed_in(role: Role) -> SessionState {
        SessionState::SignedIn(Session {
            credential: Credential::new("tok"),
            identity: Identity::new("a@b.com", role),
        })
    }

    fn hospital_scoped() -> Requirement {
        Requirement::any_of([Role::Hospital, Role::SuperAdmin])
    }

    #[test]
    fn resolving_is_loading() {
        let decision = decide(
            GuardMode::Basic,
            paths::MEDICAL_DASHBOARD,
            &hospital_scoped(),
            &SessionState::Resolving,
        );
        assert_eq!(decision, Decision::Loading);
    }

    #[test]
    fn signed_out_goes_to_sign_in() {
        let decision = decide(
            GuardMode::Basic,
            paths::MANUFACTURER_DASHBOARD,
            &Requirement::Role(Role::Manufacturer),
            &SessionState::SignedOut,
        );
        assert_eq!(decision, Decision::Redirect(Redirect::sign_in()));
    }

    #[test]
    fn manufacturer_cannot_reach_medical_dashboard() {
        let decision = decide(
            GuardMode::Basic,
            paths::MEDICAL_DASHBOARD,
            &hospital_scoped(),
            &signed_in(Role::Manufacturer),
        );
        assert_eq!(decision, Decision::Redirect(Redirect::unauthorized()));
    }

    #[test]
    fn super_admin_reaches_hospital_screens() {
        let decision = decide(
            GuardMode::Basic,
            paths::DEVICE_RISK_CHECKER,
            &hospital_scoped(),
            &signed_in(Role::SuperAdmin),
        );
        assert_eq!(decision, Decision::Render);
    }

    #[test]
    fn single_role_mismatch_is_unauthorized() {
        let decision = decide(
            GuardMode::Basic,
            paths::SUPER_ADMIN_DASHBOARD,
            &Requirement::Role(Role::SuperAdmin),
            &signed_in(Role::Hospital),
        );
        assert_eq!(decision, Decision::Redirect(Redirect::unauthorized()));
    }

    #[test]
    fn empty_allowed_set_admits_any_role() {
        let decision = decide(
            GuardMode::Basic,
            "/anything",
            &Requirement::AnyOf(Vec::new()),
            &signed_in(Role::Manufacturer),
        );
        assert_eq!(decision, Decision::Render);
    }

    #[test]
    fn public_routes_render_while_resolving_in_basic_mode() {
        let decision = decide(
            GuardMode::Basic,
            paths::LOGIN,
            &Requirement::Public,
            &SessionState::Resolving,
        );
        assert_eq!(decision, Decision::Render);
    }

    #[test]
    fn basic_mode_is_total_once_resolved() {
        let policy = RoutePolicy::standard();
        let mut states = vec![SessionState::SignedOut];
        states.extend(Role::KNOWN.iter().cloned().map(signed_in));

        for route in policy.routes() {
            for state in &states {
                let decision = decide(GuardMode::Basic, route.path, &route.requirement, state);
                let allowed = match &decision {
                    Decision::Render => true,
                    Decision::Redirect(r) => {
                        r.target == paths::LOGIN || r.target == paths::UNAUTHORIZED
                    }
                    Decision::Loading => false,
                };
                assert!(allowed, "{} {:?} -> {:?}", route.path, state, decision);
            }
        }
    }

    #[test]
    fn basic_mode_renders_home_for_super_admin() {
        let decision = decide(
            GuardMode::Basic,
            paths::HOME,
            &Requirement::Public,
            &signed_in(Role::SuperAdmin),
        );
        assert_eq!(decision, Decision::Render);
    }

    #[test]
    fn strict_mode_normalizes_generic_entry_points() {
        let decision = decide(
            GuardMode::Strict,
            paths::HOME,
            &Requirement::Public,
            &signed_in(Role::SuperAdmin),
        );
        assert_eq!(
            decision,
            Decision::Redirect(Redirect {
                target: paths::SUPER_ADMIN_DASHBOARD,
                reason: RedirectReason::Landing,
            })
        );

        let decision = decide(
            GuardMode::Strict,
            paths::DASHBOARD,
            &Requirement::Public,
            &signed_in(Role::Unrecognized("auditor".into())),
        );
        assert_eq!(
            decision,
            Decision::Redirect(Redirect {
                target: paths::MEDICAL_DASHBOARD,
                reason: RedirectReason::Landing,
            })
        );
    }

    #[test]
    fn strict_mode_blocks_cross_role_prefixes() {
        let decision = decide(
            GuardMode::Strict,
            "/manufacturer-reports",
            &Requirement::Public,
            &signed_in(Role::Hospital),
        );
        assert_eq!(decision, Decision::Redirect(Redirect::landing(&Role::Hospital)));

        let decision = decide(
            GuardMode::Strict,
            "/medical-history",
            &Requirement::Public,
            &signed_in(Role::Manufacturer),
        );
        assert_eq!(
            decision,
            Decision::Redirect(Redirect::landing(&Role::Manufacturer))
        );

        let decision = decide(
            GuardMode::Strict,
            "/super-admin-audit",
            &Requirement::Public,
            &signed_in(Role::Manufacturer),
        );
        assert_eq!(decision, Decision::Redirect(Redirect::unauthorized()));
    }

    #[test]
    fn strict_mode_lets_super_admin_through_prefixes() {
        let decision = decide(
            GuardMode::Strict,
            "/manufacturer-reports",
            &Requirement::Public,
            &signed_in(Role::SuperAdmin),
        );
        assert_eq!(decision, Decision::Render);
    }

    #[test]
    fn strict_mode_public_routes_render_when_signed_out() {
        let decision = decide(
            GuardMode::Strict,
            paths::HOME,
            &Requirement::Public,
            &SessionState::SignedOut,
        );
        assert_eq!(decision, Decision::Render);
    }

    #[test]
    fn strict_mode_public_routes_wait_while_resolving() {
        for path in [paths::HOME, paths::LOGIN] {
            let decision = decide(
                GuardMode::Strict,
                path,
                &Requirement::Public,
                &SessionState::Resolving,
            );
            assert_eq!(decision, Decision::Loading);
        }
    }

    #[test]
    fn guard_mode_parses() {
        assert_eq!("strict".parse::<GuardMode>().unwrap(), GuardMode::Strict);
        assert_eq!(" Basic ".parse::<GuardMode>().unwrap(), GuardMode::Basic);
        assert!("lenient".parse::<GuardMode>().is_err());
    }
}
