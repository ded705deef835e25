//! Text tables approximating the podman CLI's list output.
//!
//! Column spacing is elastic (widest cell plus two spaces); it is not meant
//! to match the binary byte for byte.

use chrono::{DateTime, Utc};

use super::types::{ContainerSummary, ImageSummary, NetworkSummary, PortMapping, VolumeSummary};

const PADDING: usize = 2;
const ID_WIDTH: usize = 12;
const COMMAND_WIDTH: usize = 20;
const DIGEST_WIDTH: usize = 19;
const NONE: &str = "<none>";

/// Rows aligned on tab stops.
struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(header: &[&str]) -> Self {
        Self {
            rows: vec![header.iter().map(|h| h.to_string()).collect()],
        }
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn render(&self) -> String {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &self.rows {
            // the last cell of a row is not padded
            for (i, cell) in row.iter().enumerate().take(row.len().saturating_sub(1)) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                out.push_str(cell);
                if i + 1 < row.len() {
                    let pad = widths[i] + PADDING - cell.chars().count();
                    out.extend(std::iter::repeat(' ').take(pad));
                }
            }
            out.push('\n');
        }
        out.truncate(out.trim_end_matches('\n').len());
        out
    }
}

fn truncate(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}

pub fn container_table(containers: &[ContainerSummary], now: DateTime<Utc>) -> String {
    let mut table = Table::new(&[
        "CONTAINER ID",
        "IMAGE",
        "COMMAND",
        "CREATED",
        "STATUS",
        "PORTS",
        "NAMES",
    ]);
    for c in containers {
        let mut command = c.command.join(" ");
        if command.chars().count() > COMMAND_WIDTH {
            command = format!("{}...", truncate(&command, COMMAND_WIDTH));
        }
        let status = if c.status.is_empty() {
            c.state.clone()
        } else {
            c.status.clone()
        };
        table.row(vec![
            truncate(&c.id, ID_WIDTH),
            c.image.clone(),
            command,
            time_ago(c.created.0, now),
            status,
            ports(&c.ports),
            c.names.join(","),
        ]);
    }
    table.render()
}

pub fn image_table(images: &[ImageSummary], now: DateTime<Utc>) -> String {
    let mut table = Table::new(&["REPOSITORY", "TAG", "DIGEST", "IMAGE ID", "CREATED", "SIZE"]);
    for image in images {
        let (repository, tag) = image
            .repo_tags
            .first()
            .or_else(|| image.names.first())
            .map(|reference| split_reference(reference))
            .unwrap_or_else(|| (NONE.to_string(), NONE.to_string()));
        let id = image.id.strip_prefix("sha256:").unwrap_or(&image.id);
        let digest = if image.digest.is_empty() {
            NONE.to_string()
        } else {
            truncate(&image.digest, DIGEST_WIDTH)
        };
        table.row(vec![
            repository,
            tag,
            digest,
            truncate(id, ID_WIDTH),
            time_ago(image.created.0, now),
            size(image.size),
        ]);
    }
    table.render()
}

pub fn network_table(networks: &[NetworkSummary]) -> String {
    let mut table = Table::new(&["NETWORK ID", "NAME", "DRIVER"]);
    for n in networks {
        table.row(vec![
            truncate(&n.id, ID_WIDTH),
            n.name.clone(),
            n.driver.clone(),
        ]);
    }
    table.render()
}

pub fn volume_table(volumes: &[VolumeSummary]) -> String {
    let mut table = Table::new(&["DRIVER", "VOLUME NAME"]);
    for v in volumes {
        table.row(vec![v.driver.clone(), v.name.clone()]);
    }
    table.render()
}

/// Split `repo:tag` at the last colon.
fn split_reference(reference: &str) -> (String, String) {
    match reference.rsplit_once(':') {
        Some((repository, tag)) => (repository.to_string(), tag.to_string()),
        None => (reference.to_string(), NONE.to_string()),
    }
}

fn ports(mappings: &[PortMapping]) -> String {
    mappings
        .iter()
        .map(|p| {
            if p.host_port > 0 {
                format!("{}->{}/{}", p.host_port, p.container_port, p.protocol)
            } else {
                format!("{}/{}", p.container_port, p.protocol)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// "N units ago", or `N/A` for an unknown time.
pub fn time_ago(time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(time) = time else {
        return "N/A".to_string();
    };
    let secs = (now - time).num_seconds().max(0);
    let (minute, hour, day) = (60, 60 * 60, 24 * 60 * 60);
    match secs {
        s if s < minute => format!("{} seconds ago", s),
        s if s < hour => format!("{} minutes ago", s / minute),
        s if s < day => format!("{} hours ago", s / hour),
        s if s < 30 * day => format!("{} days ago", s / day),
        s if s < 365 * day => format!("{} months ago", s / (30 * day)),
        s => format!("{} years ago", s / (365 * day)),
    }
}

/// Decimal size: `1.5 GB`, `20.0 MB`, `3.2 KB` or `512 B`.
pub fn size(bytes: i64) -> String {
    const KB: i64 = 1000;
    const MB: i64 = 1000 * KB;
    const GB: i64 = 1000 * MB;
    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}
