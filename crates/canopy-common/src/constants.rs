//! System-wide constants.

/// Default column holding the node identifier.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Default column holding the display name of a node.
pub const DEFAULT_NAME_FIELD: &str = "name";

/// Default column holding the tree partition key.
pub const DEFAULT_TREE_ID_FIELD: &str = "treeId";

/// Default column holding the depth of a node (root is 0).
pub const DEFAULT_LEVEL_FIELD: &str = "level";

/// Default column holding the left bound.
pub const DEFAULT_LEFT_FIELD: &str = "leftValue";

/// Default column holding the right bound.
pub const DEFAULT_RIGHT_FIELD: &str = "rightValue";

/// Default table name.
pub const DEFAULT_TABLE: &str = "tree";

/// Left bound of the root node of every tree partition.
pub const ROOT_LEFT: i64 = 1;

/// Level of the root node.
pub const ROOT_LEVEL: i64 = 0;

/// Maximum length of a table or column identifier.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Maximum number of records accepted by a single add operation.
pub const MAX_BATCH_NODES: usize = 10_000;
