use gsn_core::Wrapper;

/// A wrapper known only by name, persisting its elements in a table derived
/// from that name.
#[derive(Debug, Clone)]
pub struct TableWrapper {
    name: String,
    table: String,
}

impl TableWrapper {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let table = table_name(&name);
        Self { name, table }
    }
}

impl Wrapper for TableWrapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn db_alias(&self) -> &str {
        &self.table
    }
}

/// `w_` followed by the lowercased name, anything outside `[a-z0-9_]`
/// replaced by `_`.
pub fn table_name(wrapper: &str) -> String {
    let mut table = String::with_capacity(wrapper.len() + 2);
    table.push_str("w_");
    table.extend(wrapper.chars().map(|c| {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }
    }));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_identifiers() {
        assert_eq!(table_name("memory_wrapper"), "w_memory_wrapper");
        assert_eq!(table_name("Serial-Port 2"), "w_serial_port_2");
        let w = TableWrapper::new("Mem");
        assert_eq!(w.name(), "Mem");
        assert_eq!(w.db_alias(), "w_mem");
    }
}
