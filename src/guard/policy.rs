use crate::types::Role;

/// Screen paths known to the portal.
pub mod paths {
    pub const HOME: &str = "/";
    pub const DASHBOARD: &str = "/dashboard";
    pub const LOGIN: &str = "/login";
    pub const REGISTER: &str = "/register";
    pub const SUPER_ADMIN_LOGIN: &str = "/super-admin-login";
    pub const UNAUTHORIZED: &str = "/unauthorized";
    pub const MEDICAL_DASHBOARD: &str = "/medical-dashboard";
    pub const DEVICE_RISK_CHECKER: &str = "/device-risk-checker";
    pub const RISK_RESULT: &str = "/risk-result";
    pub const MANUFACTURER_DASHBOARD: &str = "/manufacturer-dashboard";
    pub const SUPER_ADMIN_DASHBOARD: &str = "/super-admin-dashboard";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Landing,
    Login,
    Register,
    SuperAdminLogin,
    Unauthorized,
    MedicalDashboard,
    DeviceRiskChecker,
    RiskResult,
    ManufacturerDashboard,
    SuperAdminDashboard,
    NotFound,
}

/// Access requirement a route declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Role(Role),
    /// Any of these roles. An empty set admits every signed-in role.
    AnyOf(Vec<Role>),
}

impl Requirement {
    #[must_use]
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::AnyOf(roles.into_iter().collect())
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub path: &'static str,
    pub screen: Screen,
    pub requirement: Requirement,
}

/// Static route table.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    routes: Vec<Route>,
}

impl RoutePolicy {
    /// The portal's route table.
    #[must_use]
    pub fn standard() -> Self {
        let hospital_scoped = || Requirement::any_of([Role::Hospital, Role::SuperAdmin]);
        let route = |path, screen, requirement| Route {
            path,
            screen,
            requirement,
        };
        Self {
            routes: vec![
                route(paths::HOME, Screen::Landing, Requirement::Public),
                route(paths::LOGIN, Screen::Login, Requirement::Public),
                route(paths::REGISTER, Screen::Register, Requirement::Public),
                route(
                    paths::SUPER_ADMIN_LOGIN,
                    Screen::SuperAdminLogin,
                    Requirement::Public,
                ),
                route(paths::UNAUTHORIZED, Screen::Unauthorized, Requirement::Public),
                route(
                    paths::MEDICAL_DASHBOARD,
                    Screen::MedicalDashboard,
                    hospital_scoped(),
                ),
                route(
                    paths::DEVICE_RISK_CHECKER,
                    Screen::DeviceRiskChecker,
                    hospital_scoped(),
                ),
                route(paths::RISK_RESULT, Screen::RiskResult, hospital_scoped()),
                route(
                    paths::MANUFACTURER_DASHBOARD,
                    Screen::ManufacturerDashboard,
                    Requirement::Role(Role::Manufacturer),
                ),
                route(
                    paths::SUPER_ADMIN_DASHBOARD,
                    Screen::SuperAdminDashboard,
                    Requirement::Role(Role::SuperAdmin),
                ),
            ],
        }
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Screen and requirement for `path`. Unmatched paths are a public not-found page.
    #[must_use]
    pub fn resolve(&self, path: &str) -> (Screen, &Requirement) {
        static NOT_FOUND: Requirement = Requirement::Public;
        let path = normalize_path(path);
        self.routes
            .iter()
            .find(|r| r.path == path)
            .map_or((Screen::NotFound, &NOT_FOUND), |r| (r.screen, &r.requirement))
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Canonical first screen for a role. Unrecognized roles land on the
/// hospital dashboard.
#[must_use]
pub fn landing_route(role: &Role) -> &'static str {
    match role {
        Role::Manufacturer => paths::MANUFACTURER_DASHBOARD,
        Role::SuperAdmin => paths::SUPER_ADMIN_DASHBOARD,
        Role::Hospital => paths::MEDICAL_DASHBOARD,
        Role::Unrecognized(other) => {
            tracing::warn!(role = %other, "Unrecognized role, using hospital landing route");
            paths::MEDICAL_DASHBOARD
        }
    }
}

/// Strip query, fragment and trailing slash.
pub(crate) fn normalize_path(path: &str) -> &str {
    let end = path.find(&['?', '#'][..]).unwrap_or(path.len());
    let path = &path[..end];
    match path.trim_end_matches('/') {
        "" => paths::HOME,
        trimmed => trimmed,
    }
}
