//! MySQL driver for sqlproc

mod connection;
mod decode;
mod establish;
mod ssh;

pub use connection::MySqlConnection;
pub use decode::{column_type_name, decode_default, decode_value, field_info};
pub use establish::{
    MySqlConnectionFactory, connect, connect_raw, open_database, open_database_from_env,
};
pub use ssh::{SshTunnel, SshTunnelError, TunnelTarget};
