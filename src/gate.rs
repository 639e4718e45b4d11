use std::fmt;

use crate::models::Role;
use crate::session::{SessionStorage, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Dashboard,
    Students,
    StudentDetail(String),
    Upload,
    Counseling,
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim();
        let trimmed = trimmed.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Root,
            ["login"] => Route::Login,
            ["dashboard"] => Route::Dashboard,
            ["students"] => Route::Students,
            ["students", id] => Route::StudentDetail((*id).to_string()),
            ["upload"] => Route::Upload,
            ["counseling"] => Route::Counseling,
            _ => Route::NotFound(trimmed.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Root => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Students => "/students".to_string(),
            Route::StudentDetail(id) => format!("/students/{id}"),
            Route::Upload => "/upload".to_string(),
            Route::Counseling => "/counseling".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Dashboard
                | Route::Students
                | Route::StudentDetail(_)
                | Route::Upload
                | Route::Counseling
        )
    }

    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Upload => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Route),
}

pub fn guard<S: SessionStorage>(route: &Route, store: &SessionStore<S>) -> Access {
    if *route == Route::Root {
        return Access::Redirect(Route::Dashboard);
    }
    if !route.is_protected() {
        return Access::Allow;
    }
    if !store.is_authenticated() {
        return Access::Redirect(Route::Login);
    }
    if let Some(required) = route.required_role() {
        let permitted = store.user().map(|user| user.role.permits(required)).unwrap_or(false);
        if !permitted {
            return Access::Redirect(Route::Dashboard);
        }
    }
    Access::Allow
}

/// Follows redirects until a route is allowed.
pub fn resolve<S: SessionStorage>(route: Route, store: &SessionStore<S>) -> Route {
    let mut current = route;
    // Redirect chains are at most Root -> Dashboard -> Login.
    for _ in 0..4 {
        match guard(&current, store) {
            Access::Allow => return current,
            Access::Redirect(next) => {
                tracing::debug!(from = %current, to = %next, "route redirected");
                current = next;
            }
        }
    }
    current
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub title: &'static str,
    pub route: Route,
    pub admin_section: bool,
}

pub fn nav_items(role: Option<Role>) -> Vec<NavItem> {
    let mut items = vec![
        NavItem {
            title: "Dashboard",
            route: Route::Dashboard,
            admin_section: false,
        },
        NavItem {
            title: "Students",
            route: Route::Students,
            admin_section: false,
        },
        NavItem {
            title: "Counseling",
            route: Route::Counseling,
            admin_section: false,
        },
    ];

    let upload = Route::Upload;
    let allowed = match (role, upload.required_role()) {
        (Some(role), Some(required)) => role.permits(required),
        (_, None) => true,
        (None, Some(_)) => false,
    };
    if allowed {
        items.push(NavItem {
            title: "CSV Upload",
            route: upload,
            admin_section: true,
        });
    }

    items
}
