use shared::domain::{Operation, Role};

/// Primary route plus ordered fallbacks for one logical operation.
///
/// The backend's true route naming has drifted over time, so each operation
/// carries the historically observed alternatives. The resolver tries them
/// in this order; pinning a single contractual route later is an edit to
/// this table only.
#[derive(Debug, Clone, Copy)]
pub struct RouteSet {
    pub primary: &'static str,
    pub fallbacks: &'static [&'static str],
}

pub fn routes_for(role: Role, op: Operation) -> RouteSet {
    match (role, op) {
        (Role::Student, Operation::SignIn) => RouteSet {
            primary: "/api/students/login",
            fallbacks: &[
                "/api/student/login",
                "/api/students/authenticate",
                "/api/auth/student/login",
                "/api/student/signin",
            ],
        },
        (Role::Student, Operation::Register) => RouteSet {
            primary: "/api/students/add-student",
            fallbacks: &[
                "/api/student/register",
                "/api/students/register",
                "/api/student/add",
                "/api/auth/student/register",
            ],
        },
        (Role::Professor, Operation::SignIn) => RouteSet {
            primary: "/api/professors/login",
            fallbacks: &[
                "/api/professor/login",
                "/api/professors/authenticate",
                "/api/auth/professor/login",
                "/api/professor/signin",
            ],
        },
        (Role::Professor, Operation::Register) => RouteSet {
            primary: "/api/professors/add-prof",
            fallbacks: &[
                "/api/professor/register",
                "/api/professors/register",
                "/api/professor/add",
                "/api/auth/professor/register",
            ],
        },
        (Role::Hod, Operation::SignIn) => RouteSet {
            primary: "/api/hods/login",
            fallbacks: &[
                "/api/hod/login",
                "/api/hods/authenticate",
                "/api/auth/hod/login",
                "/api/hod/signin",
            ],
        },
        (Role::Hod, Operation::Register) => RouteSet {
            primary: "/api/hods/add-hod",
            fallbacks: &[
                "/api/hod/register",
                "/api/hods/register",
                "/api/hod/add",
                "/api/auth/hod/register",
            ],
        },
    }
}

/// Profile lookup by identifier; single contractual route, no fallbacks.
pub fn profile_path(role: Role, id: &str) -> String {
    format!("/api/{}/{id}", role.collection_segment())
}
