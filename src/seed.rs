//! Seeds the demo rows the reports run against.
//!
//! Fixed literals, employee strictly before email so the referential
//! invariant holds at every point.

use crate::error::StorageError;
use crate::model::{Email, Employee, NewEmail, NewEmployee};
use crate::store::RecordStore;

/// The rows one seed invocation produced.
#[derive(Debug, Clone)]
pub struct Seeded {
    pub employee: Employee,
    pub email: Email,
}

/// Insert one employee ("John", "Smith", 150000.0) and one email
/// ("john@smith.com") bound to it.
pub fn seed(store: &RecordStore) -> Result<Seeded, StorageError> {
    let employee = store.insert_employee(&NewEmployee::new("John", "Smith", 150_000.0))?;
    let email = store.insert_email(&NewEmail::new("john@smith.com", employee.id))?;
    tracing::debug!(
        employee_id = employee.id,
        email_id = email.id,
        "seeded demo rows"
    );
    Ok(Seeded { employee, email })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_twice_keeps_each_email_on_its_own_employee() {
        let store = RecordStore::open_in_memory().expect("open store");
        let first = seed(&store).expect("first seed");
        let second = seed(&store).expect("second seed");

        assert_ne!(first.employee.id, second.employee.id);
        assert_ne!(first.email.id, second.email.id);
        assert_eq!(first.email.employee_id, first.employee.id);
        assert_eq!(second.email.employee_id, second.employee.id);
        assert_eq!(store.employee_count().unwrap(), 2);
        assert_eq!(store.email_count().unwrap(), 2);
    }

    #[test]
    fn seed_uses_the_fixed_literals() {
        let store = RecordStore::open_in_memory().expect("open store");
        let seeded = seed(&store).expect("seed");
        assert_eq!(seeded.employee.first_name, "John");
        assert_eq!(seeded.employee.last_name, "Smith");
        assert_eq!(seeded.employee.salary, 150_000.0);
        assert_eq!(seeded.email.address, "john@smith.com");
    }
}
