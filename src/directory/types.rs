//! Roster records: users, employees and catalogs.

use serde::{Deserialize, Serialize};

/// Role of an authenticated user. Drives which tasks a viewer sees and
/// which completion rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Director,
    Manager,
    HrHead,
    UnitLead,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Director => "director",
            Role::Manager => "manager",
            Role::HrHead => "hr_head",
            Role::UnitLead => "unit_lead",
            Role::Employee => "employee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "director" => Some(Role::Director),
            "manager" => Some(Role::Manager),
            "hr_head" | "hr" => Some(Role::HrHead),
            "unit_lead" | "lead" => Some(Role::UnitLead),
            "employee" | "worker" => Some(Role::Employee),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboard account. Passwords are plaintext; hardening is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    pub role: Role,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Archived,
    Inactive,
}

impl EmployeeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Archived => "archived",
            EmployeeStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "archived" => EmployeeStatus::Archived,
            "inactive" => EmployeeStatus::Inactive,
            _ => EmployeeStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub photo_url: String,
    pub catalog_id: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub residence: String,
    #[serde(default)]
    pub passport_serial: String,
    #[serde(default, rename = "passportPIN")]
    pub passport_pin: String,
    #[serde(default)]
    pub status: EmployeeStatus,
    /// `HH:MM-HH:MM`
    #[serde(default)]
    pub working_hours: String,
    #[serde(default)]
    pub working_days: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_password: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_to_id: Option<String>,
}

impl Employee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }

    /// Start of the employee's own shift, if `working_hours` is set.
    pub fn shift_start(&self) -> Option<chrono::NaiveTime> {
        let start = self.working_hours.split('-').next()?;
        crate::util::parse_clock(start)
    }
}

/// Partial employee update. Only present fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub position: Option<String>,
    pub photo_url: Option<String>,
    pub catalog_id: Option<String>,
    pub phone_number: Option<String>,
    pub residence: Option<String>,
    pub passport_serial: Option<String>,
    #[serde(rename = "passportPIN")]
    pub passport_pin: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub working_hours: Option<String>,
    pub working_days: Option<Vec<String>>,
    pub system_login: Option<String>,
    pub system_password: Option<String>,
    pub is_online: Option<bool>,
    pub qr_code: Option<String>,
    pub reports_to_id: Option<String>,
}

impl EmployeeUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.middle_name.is_none()
            && self.position.is_none()
            && self.photo_url.is_none()
            && self.catalog_id.is_none()
            && self.phone_number.is_none()
            && self.residence.is_none()
            && self.passport_serial.is_none()
            && self.passport_pin.is_none()
            && self.status.is_none()
            && self.working_hours.is_none()
            && self.working_days.is_none()
            && self.system_login.is_none()
            && self.system_password.is_none()
            && self.is_online.is_none()
            && self.qr_code.is_none()
            && self.reports_to_id.is_none()
    }

    pub fn apply(self, employee: &mut Employee) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { employee.$field = v; })*
            };
        }
        set!(
            first_name,
            last_name,
            middle_name,
            position,
            photo_url,
            catalog_id,
            phone_number,
            residence,
            passport_serial,
            passport_pin,
            status,
            working_hours,
            working_days,
            is_online
        );
        if self.system_login.is_some() {
            employee.system_login = self.system_login;
        }
        if self.system_password.is_some() {
            employee.system_password = self.system_password;
        }
        if self.qr_code.is_some() {
            employee.qr_code = self.qr_code;
        }
        if self.reports_to_id.is_some() {
            employee.reports_to_id = self.reports_to_id;
        }
    }
}

/// A department or organizational unit, optionally nested under a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub positions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}
