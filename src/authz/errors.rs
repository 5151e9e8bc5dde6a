use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("Failed to load catalog file `{path}`")]
    #[diagnostic(
        code(fleetgate::catalog::load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    CatalogLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog: {0}")]
    #[diagnostic(
        code(fleetgate::catalog::invalid),
        help("Each catalog file must contain valid `permission`, `role`, or `user` KDL nodes")
    )]
    InvalidCatalog(String),

    #[error("Invalid constraint on permission `{permission}`: {message}")]
    #[diagnostic(
        code(fleetgate::catalog::invalid_constraint),
        help(
            "Constraint nodes take a single argument or properties, e.g. `owned-only true` or `geofence lat=52.5 lng=13.4 radius-km=25.0`"
        )
    )]
    InvalidConstraint { permission: String, message: String },

    #[error("Unknown {field} `{value}`")]
    #[diagnostic(
        code(fleetgate::catalog::unknown_value),
        help("Resource, action, role type, and priority values are closed enumerations; check the spelling against the documented set")
    )]
    UnknownValue { field: &'static str, value: String },

    #[error("Role `{role}` references undefined permission `{permission}`")]
    #[diagnostic(
        code(fleetgate::catalog::undefined_permission),
        help("Define the permission with: permission \"<id>\" resource=\"<type>\" action=\"<action>\"")
    )]
    UndefinedPermission { role: String, permission: String },

    #[error("User `{user}` references undefined role `{role}`")]
    #[diagnostic(
        code(fleetgate::catalog::undefined_role),
        help("Define the role with: role \"<id>\" name=\"<display>\" type=\"<role type>\"")
    )]
    UndefinedRole { user: String, role: String },

    #[error("User `{user}` references undefined direct permission `{permission}`")]
    #[diagnostic(code(fleetgate::catalog::undefined_direct_permission))]
    UndefinedDirectPermission { user: String, permission: String },

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(fleetgate::catalog::kdl_parse),
        help("Check the file against the KDL syntax reference at https://kdl.dev")
    )]
    KdlParse(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(fleetgate::catalog::io))]
    Io(#[from] std::io::Error),
}
