//! Human-readable status messages shared by statuses and events.

pub const HOST_ALREADY_KNOWN: &str = "Unable to add host. Host is already in the database.";
pub const HOST_NOT_IN_DATABASE: &str = "Host is not in database and can't be refreshed.";
pub const OPERATION_IN_PROGRESS: &str = "Operation already in progress for this host.";
pub const SCHEDULING_DETECTOR: &str = "Scheduling detector on the host.";
pub const DETECTOR_SCHEDULED: &str = "Detector has been successfully scheduled. Waiting for data.";
pub const SCHEDULING_FAILED: &str = "Unable to schedule detector on host, reason: ";
pub const HOST_ADDED: &str = "Host was successfully added to the database.";
pub const HOST_NOT_ADDED: &str = "Host was not added, reason: ";
pub const REFRESH_SUCCEEDED: &str = "Refresh successful.";
pub const REFRESH_FAILED: &str = "Refresh failed, reason: ";
pub const REFRESH_REJECTED: &str = "Unable to refresh host, reason: ";
pub const TIMED_OUT: &str = "No data received for host (timed out).";
pub const CONNECTING: &str = "Connecting to the host.";
pub const CONNECTED: &str = "Host connected successfully.";
pub const CONNECT_FAILED: &str = "Unable to connect host, reason: ";
pub const MONITOR_INIT_FAILED: &str = "Unable to initialize monitoring on the host: ";
pub const ERROR_ACQUIRING_DATA: &str = "Error acquiring data: ";
pub const SCAN_STATUS_LOST: &str = "scan status is no longer available.";
pub const HOST_REMOVED: &str = "Host was removed from the database.";
pub const HOST_DISCONNECTED: &str = "Host disconnected.";
pub const DISCONNECT_FAILED: &str = "Unable to stop monitoring the host: ";
