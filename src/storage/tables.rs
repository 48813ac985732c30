use redb::TableDefinition;

/// User profiles: user uuid -> UserProfile (msgpack)
pub const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Folder records: folder uuid -> Folder (msgpack)
pub const FOLDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("folders");

/// File records: file uuid -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Owner index: user uuid -> msgpack Vec of file UUIDs
pub const OWNER_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_files");

/// Owner index: user uuid -> msgpack Vec of folder UUIDs
pub const OWNER_FOLDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_folders");
