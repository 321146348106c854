//! Employee directory and department hierarchy.
//!
//! Pure roster logic lives here; persistence goes through [`crate::store::HrStore`].
//! The workflow engine uses [`Roster`] to resolve assignees and to check that a
//! worker belongs to the department a chain step targets.

mod types;

pub use types::{Catalog, Employee, EmployeeStatus, EmployeeUpdate, Role, User};

use std::collections::{HashMap, HashSet};

/// Errors raised by roster validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("Catalog {0} not found")]
    UnknownCatalog(String),

    #[error("Catalog {0} already exists")]
    DuplicateCatalog(String),

    #[error("Catalog {0} cannot be its own parent")]
    SelfParent(String),

    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Snapshot of employees and catalogs used for lookups.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    employees: HashMap<String, Employee>,
    catalogs: HashMap<String, Catalog>,
}

impl Roster {
    pub fn new(employees: Vec<Employee>, catalogs: Vec<Catalog>) -> Self {
        Self {
            employees: employees.into_iter().map(|e| (e.id.clone(), e)).collect(),
            catalogs: catalogs.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.get(id)
    }

    pub fn catalog(&self, id: &str) -> Option<&Catalog> {
        self.catalogs.get(id)
    }

    pub fn display_name(&self, employee_id: &str) -> Option<String> {
        self.employee(employee_id).map(Employee::display_name)
    }

    /// Ids of `root` and every catalog nested under it.
    ///
    /// Parent links are user data, so cycles are tolerated: each catalog is
    /// visited at most once.
    pub fn subtree(&self, root: &str) -> HashSet<String> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for catalog in self.catalogs.values() {
            if let Some(parent) = catalog.parent_id.as_deref() {
                children.entry(parent).or_default().push(catalog.id.as_str());
            }
        }

        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.to_string()) {
                continue;
            }
            if let Some(kids) = children.get(id) {
                stack.extend(kids.iter().copied());
            }
        }
        seen
    }

    /// Whether the employee sits in `department_id` or one of its sub-departments.
    pub fn in_department(&self, employee_id: &str, department_id: &str) -> bool {
        match self.employee(employee_id) {
            Some(emp) => self.subtree(department_id).contains(&emp.catalog_id),
            None => false,
        }
    }

    /// Active employees that can be assigned work in a department, sorted by name.
    pub fn assignable_workers(&self, department_id: &str) -> Vec<&Employee> {
        let subtree = self.subtree(department_id);
        let mut workers: Vec<&Employee> = self
            .employees
            .values()
            .filter(|e| e.is_active() && subtree.contains(&e.catalog_id))
            .collect();
        workers.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        workers
    }
}

/// Check the fields an employee record cannot do without.
pub fn validate_employee(employee: &Employee, catalogs: &[Catalog]) -> Result<(), DirectoryError> {
    if employee.first_name.trim().is_empty() {
        return Err(DirectoryError::MissingField("firstName"));
    }
    if employee.last_name.trim().is_empty() {
        return Err(DirectoryError::MissingField("lastName"));
    }
    if employee.catalog_id.trim().is_empty() {
        return Err(DirectoryError::MissingField("catalogId"));
    }
    if !catalogs.iter().any(|c| c.id == employee.catalog_id) {
        return Err(DirectoryError::UnknownCatalog(employee.catalog_id.clone()));
    }
    Ok(())
}

/// Validate a new catalog against the existing set.
pub fn validate_new_catalog(catalog: &Catalog, existing: &[Catalog]) -> Result<(), DirectoryError> {
    if catalog.id.trim().is_empty() {
        return Err(DirectoryError::MissingField("id"));
    }
    if catalog.name.trim().is_empty() {
        return Err(DirectoryError::MissingField("name"));
    }
    if existing.iter().any(|c| c.id == catalog.id) {
        return Err(DirectoryError::DuplicateCatalog(catalog.id.clone()));
    }
    if let Some(parent) = catalog.parent_id.as_deref() {
        if parent == catalog.id {
            return Err(DirectoryError::SelfParent(catalog.id.clone()));
        }
        if !existing.iter().any(|c| c.id == parent) {
            return Err(DirectoryError::UnknownCatalog(parent.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn catalog(id: &str, parent: Option<&str>) -> Catalog {
        Catalog {
            id: id.to_string(),
            name: id.to_uppercase(),
            positions: vec![],
            parent_id: parent.map(|p| p.to_string()),
        }
    }

    pub(crate) fn employee(id: &str, first: &str, last: &str, catalog_id: &str) -> Employee {
        Employee {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            catalog_id: catalog_id.to_string(),
            ..Default::default()
        }
    }

    fn sample_roster() -> Roster {
        let mut archived = employee("e4", "Old", "Timer", "it");
        archived.status = EmployeeStatus::Archived;
        Roster::new(
            vec![
                employee("e1", "Ann", "Lee", "it"),
                employee("e2", "Bob", "Kim", "it-support"),
                employee("e3", "Cid", "Ray", "sales"),
                archived,
            ],
            vec![
                catalog("it", None),
                catalog("it-support", Some("it")),
                catalog("helpdesk", Some("it-support")),
                catalog("sales", None),
            ],
        )
    }

    #[test]
    fn employee_needs_names_and_known_catalog() {
        let catalogs = vec![catalog("it", None)];
        assert!(validate_employee(&employee("e1", "Ann", "Lee", "it"), &catalogs).is_ok());
        assert!(matches!(
            validate_employee(&employee("e1", "", "Lee", "it"), &catalogs),
            Err(DirectoryError::MissingField("firstName"))
        ));
        assert!(matches!(
            validate_employee(&employee("e1", "Ann", "Lee", "hr"), &catalogs),
            Err(DirectoryError::UnknownCatalog(_))
        ));
    }

    #[test]
    fn subtree_includes_nested_catalogs() {
        let roster = sample_roster();
        let subtree = roster.subtree("it");
        assert!(subtree.contains("it"));
        assert!(subtree.contains("it-support"));
        assert!(subtree.contains("helpdesk"));
        assert!(!subtree.contains("sales"));
    }

    #[test]
    fn subtree_survives_parent_cycles() {
        let roster = Roster::new(vec![], vec![catalog("a", Some("b")), catalog("b", Some("a"))]);
        let subtree = roster.subtree("a");
        assert_eq!(subtree.len(), 2);
    }

    #[test]
    fn assignable_workers_cover_sub_departments_and_skip_archived() {
        let roster = sample_roster();
        let ids: Vec<&str> = roster
            .assignable_workers("it")
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }

    #[test]
    fn in_department_checks_membership() {
        let roster = sample_roster();
        assert!(roster.in_department("e2", "it"));
        assert!(!roster.in_department("e3", "it"));
        assert!(!roster.in_department("missing", "it"));
    }

    #[test]
    fn display_name_joins_first_and_last() {
        let roster = sample_roster();
        assert_eq!(roster.display_name("e1").as_deref(), Some("Ann Lee"));
    }

    #[test]
    fn new_catalog_validation() {
        let existing = vec![catalog("it", None)];
        assert!(validate_new_catalog(&catalog("ops", None), &existing).is_ok());
        assert!(validate_new_catalog(&catalog("ops", Some("it")), &existing).is_ok());
        assert!(matches!(
            validate_new_catalog(&catalog("it", None), &existing),
            Err(DirectoryError::DuplicateCatalog(_))
        ));
        assert!(matches!(
            validate_new_catalog(&catalog("ops", Some("nope")), &existing),
            Err(DirectoryError::UnknownCatalog(_))
        ));
        assert!(matches!(
            validate_new_catalog(&catalog("ops", Some("ops")), &existing),
            Err(DirectoryError::SelfParent(_))
        ));
    }

    #[test]
    fn employee_update_applies_only_present_fields() {
        let mut emp = employee("e1", "Ann", "Lee", "it");
        let update = EmployeeUpdate {
            position: Some("Lead".to_string()),
            status: Some(EmployeeStatus::Archived),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply(&mut emp);
        assert_eq!(emp.position, "Lead");
        assert_eq!(emp.status, EmployeeStatus::Archived);
        assert_eq!(emp.first_name, "Ann");
        assert!(EmployeeUpdate::default().is_empty());
    }

    #[test]
    fn shift_start_parses_working_hours() {
        let mut emp = employee("e1", "Ann", "Lee", "it");
        assert!(emp.shift_start().is_none());
        emp.working_hours = "08:30-17:00".to_string();
        assert_eq!(emp.shift_start(), chrono::NaiveTime::from_hms_opt(8, 30, 0));
    }
}
