/// Declarative provisioning baseline.
///
/// New roles and permissions extend these tables; the provisioning
/// algorithm never branches on specific codes.
use warden_core::{NewPermission, NewRole};

pub struct PermissionDef {
    pub code: &'static str,
    pub name: &'static str,
    pub localized_name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

impl PermissionDef {
    pub fn to_new(&self) -> NewPermission {
        NewPermission {
            code: self.code.to_string(),
            name: self.name.to_string(),
            localized_name: self.localized_name.to_string(),
            description: self.description.to_string(),
            category: self.category.to_string(),
        }
    }
}

pub struct RoleDef {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

impl RoleDef {
    pub fn to_new(&self) -> NewRole {
        NewRole {
            code: self.code.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
        }
    }
}

/// One role's declared default grant set.
pub struct RoleGrants {
    pub role: &'static str,
    pub permissions: &'static [&'static str],
}

pub const DEFAULT_PERMISSIONS: &[PermissionDef] = &[
    PermissionDef {
        code: "view_todo",
        name: "View todos",
        localized_name: "Ver tareas",
        description: "Read todo items and their details",
        category: "todo",
    },
    PermissionDef {
        code: "create_todo",
        name: "Create todos",
        localized_name: "Crear tareas",
        description: "Create new todo items",
        category: "todo",
    },
    PermissionDef {
        code: "edit_todo",
        name: "Edit todos",
        localized_name: "Editar tareas",
        description: "Modify existing todo items",
        category: "todo",
    },
    PermissionDef {
        code: "delete_todo",
        name: "Delete todos",
        localized_name: "Eliminar tareas",
        description: "Permanently remove todo items",
        category: "todo",
    },
    PermissionDef {
        code: "complete_todo",
        name: "Complete todos",
        localized_name: "Completar tareas",
        description: "Mark todo items as done",
        category: "todo",
    },
    PermissionDef {
        code: "view_reports",
        name: "View reports",
        localized_name: "Ver informes",
        description: "Read progress and activity reports",
        category: "report",
    },
    PermissionDef {
        code: "export_reports",
        name: "Export reports",
        localized_name: "Exportar informes",
        description: "Export reports to external formats",
        category: "report",
    },
    PermissionDef {
        code: "manage_users",
        name: "Manage users",
        localized_name: "Gestionar usuarios",
        description: "Administer user accounts",
        category: "admin",
    },
    PermissionDef {
        code: "manage_permissions",
        name: "Manage permissions",
        localized_name: "Gestionar permisos",
        description: "Administer roles, permissions, and grants",
        category: "admin",
    },
];

pub const DEFAULT_ROLES: &[RoleDef] = &[
    RoleDef {
        code: "ADMIN",
        name: "Administrator",
        description: "Full access to every capability",
    },
    RoleDef {
        code: "PROJECT_MANAGER",
        name: "Project Manager",
        description: "Day-to-day management, no destructive or admin capabilities",
    },
    RoleDef {
        code: "VIEWER",
        name: "Viewer",
        description: "Read-only access",
    },
];

pub const DEFAULT_GRANTS: &[RoleGrants] = &[
    RoleGrants {
        role: "ADMIN",
        permissions: &[
            "view_todo",
            "create_todo",
            "edit_todo",
            "delete_todo",
            "complete_todo",
            "view_reports",
            "export_reports",
            "manage_users",
            "manage_permissions",
        ],
    },
    RoleGrants {
        role: "PROJECT_MANAGER",
        permissions: &[
            "view_todo",
            "create_todo",
            "edit_todo",
            "complete_todo",
            "view_reports",
            "export_reports",
        ],
    },
    RoleGrants {
        role: "VIEWER",
        permissions: &["view_todo", "view_reports"],
    },
];
