/// Category assigned to records whose group-by field is missing, null or empty.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Default value key for aggregated series bound to charts.
pub const DEFAULT_VALUE_FIELD: &str = "value";

/// Number of colors in the chart palette; slices and bars cycle through it.
pub const CHART_PALETTE_SIZE: usize = 4;

/// Record primary key field.
pub const ID_FIELD: &str = "id";

/// Display name field shared by branches, clients, employees, equipment and projects.
pub const NAME_FIELD: &str = "name";

/// Status field on projects, equipment and employees.
pub const STATUS_FIELD: &str = "status";

/// Foreign key from clients, employees, equipment and projects to their branch.
pub const BRANCH_ID_FIELD: &str = "branch_id";

/// Next scheduled calibration date on equipment.
pub const NEXT_CALIBRATION_FIELD: &str = "next_calibration";
