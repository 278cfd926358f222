use relsync_core::InstalledUnit;

/// Ordered record of every tracked unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub units: Vec<InstalledUnit>,
}

impl Manifest {
    pub fn new(units: Vec<InstalledUnit>) -> Self {
        Self { units }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn find(&self, identifier: &str) -> Option<&InstalledUnit> {
        self.units.iter().find(|unit| unit.identifier == identifier)
    }

    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.units
            .iter()
            .position(|unit| unit.identifier == identifier)
    }

    /// Looks a unit up by identifier first, then by recorded directory.
    pub fn find_target(&self, target: &str) -> Option<&InstalledUnit> {
        self.find(target).or_else(|| {
            self.units
                .iter()
                .find(|unit| unit.matches_target(target))
        })
    }

    /// Identifier of the unit that has `directory` recorded, if any.
    pub fn directory_owner(&self, directory: &str) -> Option<&str> {
        self.units
            .iter()
            .find(|unit| unit.directory.as_deref() == Some(directory))
            .map(|unit| unit.identifier.as_str())
    }

    /// Replaces the entry with the same identifier in place, or appends.
    pub fn upsert(&mut self, unit: InstalledUnit) {
        match self.position(&unit.identifier) {
            Some(index) => self.units[index] = unit,
            None => self.units.push(unit),
        }
    }

    pub fn remove(&mut self, identifier: &str) -> Option<InstalledUnit> {
        let index = self.position(identifier)?;
        Some(self.units.remove(index))
    }
}
