use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::{Cluster, Node, Volume};

/// Lookups that fail because a record does not exist.
///
/// Returned inside `anyhow::Error`; handlers downcast to answer 404.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Volume not found: {0}")]
    VolumeNotFound(String),
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),
    #[error("No nodes in cluster: {0}")]
    NodeNotFound(String),
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Create an empty cluster
pub fn create_cluster(conn: &Connection) -> Result<Cluster> {
    let cluster_id = Uuid::new_v4().to_string();
    let created_at = now();

    conn.execute(
        "INSERT INTO clusters (cluster_id, created_at) VALUES (?1, ?2)",
        rusqlite::params![cluster_id, created_at],
    )
    .context("Failed to insert cluster")?;

    Ok(Cluster {
        cluster_id,
        nodes: Vec::new(),
        volumes: Vec::new(),
        created_at,
    })
}

/// Get a cluster with its node and volume ids
pub fn get_cluster(conn: &Connection, cluster_id: &str) -> Result<Cluster> {
    let created_at: i64 = conn
        .query_row(
            "SELECT created_at FROM clusters WHERE cluster_id = ?1",
            [cluster_id],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query cluster")?
        .ok_or_else(|| LookupError::ClusterNotFound(cluster_id.to_string()))?;

    let nodes = ids(
        conn,
        "SELECT node_id FROM nodes WHERE cluster_id = ?1 ORDER BY registered_at, rowid",
        cluster_id,
    )?;
    let volumes = ids(
        conn,
        "SELECT volume_id FROM volumes WHERE cluster_id = ?1 ORDER BY created_at, rowid",
        cluster_id,
    )?;

    Ok(Cluster {
        cluster_id: cluster_id.to_string(),
        nodes,
        volumes,
        created_at,
    })
}

/// List all clusters
pub fn list_clusters(conn: &Connection) -> Result<Vec<Cluster>> {
    let mut stmt = conn
        .prepare("SELECT cluster_id FROM clusters ORDER BY created_at, rowid")
        .context("Failed to prepare statement")?;

    let cluster_ids = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("Failed to query clusters")?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to collect clusters")?;

    cluster_ids
        .iter()
        .map(|id| get_cluster(conn, id))
        .collect()
}

fn ids(conn: &Connection, sql: &str, cluster_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql).context("Failed to prepare statement")?;
    let rows = stmt
        .query_map([cluster_id], |row| row.get(0))
        .context("Failed to query ids")?
        .collect::<Result<Vec<String>, _>>()
        .context("Failed to collect ids")?;
    Ok(rows)
}

fn ensure_cluster(conn: &Connection, cluster_id: &str) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM clusters WHERE cluster_id = ?1",
            [cluster_id],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query cluster")?;

    if exists.is_none() {
        return Err(LookupError::ClusterNotFound(cluster_id.to_string()).into());
    }
    Ok(())
}

/// Register a storage node in a cluster
pub fn add_node(
    conn: &Connection,
    cluster_id: &str,
    manage_hostname: &str,
    storage_hostname: &str,
) -> Result<Node> {
    ensure_cluster(conn, cluster_id)?;

    let node_id = Uuid::new_v4().to_string();
    let registered_at = now();

    conn.execute(
        "INSERT INTO nodes (node_id, cluster_id, manage_hostname, storage_hostname, registered_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![node_id, cluster_id, manage_hostname, storage_hostname, registered_at],
    )
    .context("Failed to insert node")?;

    Ok(Node {
        node_id,
        cluster_id: cluster_id.to_string(),
        manage_hostname: manage_hostname.to_string(),
        storage_hostname: storage_hostname.to_string(),
        registered_at,
    })
}

/// Record an existing gluster volume so sessions can be managed for it
pub fn create_volume(conn: &Connection, name: &str, cluster_id: &str) -> Result<Volume> {
    ensure_cluster(conn, cluster_id)?;

    let volume_id = Uuid::new_v4().to_string();
    let created_at = now();

    conn.execute(
        "INSERT INTO volumes (volume_id, name, cluster_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![volume_id, name, cluster_id, created_at],
    )
    .with_context(|| format!("Failed to insert volume {}", name))?;

    Ok(Volume {
        volume_id,
        name: name.to_string(),
        cluster_id: cluster_id.to_string(),
        created_at,
    })
}

/// Get volume by ID
pub fn get_volume(conn: &Connection, volume_id: &str) -> Result<Volume> {
    conn.query_row(
        "SELECT volume_id, name, cluster_id, created_at FROM volumes WHERE volume_id = ?1",
        [volume_id],
        |row| {
            Ok(Volume {
                volume_id: row.get(0)?,
                name: row.get(1)?,
                cluster_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
    .context("Failed to query volume")?
    .ok_or_else(|| LookupError::VolumeNotFound(volume_id.to_string()).into())
}

/// List all volumes
pub fn list_volumes(conn: &Connection) -> Result<Vec<Volume>> {
    let mut stmt = conn
        .prepare("SELECT volume_id, name, cluster_id, created_at FROM volumes ORDER BY created_at, rowid")
        .context("Failed to prepare statement")?;

    let volumes = stmt
        .query_map([], |row| {
            Ok(Volume {
                volume_id: row.get(0)?,
                name: row.get(1)?,
                cluster_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .context("Failed to query volumes")?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to collect volumes")?;

    Ok(volumes)
}

/// Management hostname of the first node registered in the cluster
pub fn cluster_manage_host(conn: &Connection, cluster_id: &str) -> Result<String> {
    ensure_cluster(conn, cluster_id)?;

    conn.query_row(
        "SELECT manage_hostname FROM nodes WHERE cluster_id = ?1 ORDER BY registered_at, rowid LIMIT 1",
        [cluster_id],
        |row| row.get(0),
    )
    .optional()
    .context("Failed to query nodes")?
    .ok_or_else(|| LookupError::NodeNotFound(cluster_id.to_string()).into())
}

/// Volume → cluster → first node: the host that runs the volume's commands
pub fn resolve_volume_host(conn: &Connection, volume_id: &str) -> Result<(Volume, String)> {
    let volume = get_volume(conn, volume_id)?;
    let host = cluster_manage_host(conn, &volume.cluster_id)?;
    Ok((volume, host))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn.execute_batch(include_str!("../../migrations/001_inventory.sql"))
            .unwrap();
        conn.execute_batch(include_str!("../../migrations/002_volumes.sql"))
            .unwrap();
        conn
    }

    fn lookup_error(err: anyhow::Error) -> LookupError {
        err.downcast::<LookupError>().expect("expected a lookup error")
    }

    #[test]
    fn test_resolve_uses_first_node() {
        let conn = test_conn();
        let cluster = create_cluster(&conn).unwrap();
        add_node(&conn, &cluster.cluster_id, "node1.mgmt", "node1.storage").unwrap();
        add_node(&conn, &cluster.cluster_id, "node2.mgmt", "node2.storage").unwrap();
        let volume = create_volume(&conn, "vol_1", &cluster.cluster_id).unwrap();

        let (found, host) = resolve_volume_host(&conn, &volume.volume_id).unwrap();
        assert_eq!(found.name, "vol_1");
        assert_eq!(host, "node1.mgmt");

        let cluster = get_cluster(&conn, &cluster.cluster_id).unwrap();
        assert_eq!(cluster.nodes.len(), 2);
        assert_eq!(cluster.volumes, vec![volume.volume_id]);
    }

    #[test]
    fn test_volume_not_found() {
        let conn = test_conn();
        let err = resolve_volume_host(&conn, "missing").unwrap_err();
        assert_eq!(
            lookup_error(err),
            LookupError::VolumeNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_node_not_found() {
        let conn = test_conn();
        let cluster = create_cluster(&conn).unwrap();
        let volume = create_volume(&conn, "vol_1", &cluster.cluster_id).unwrap();

        let err = resolve_volume_host(&conn, &volume.volume_id).unwrap_err();
        assert_eq!(
            lookup_error(err),
            LookupError::NodeNotFound(cluster.cluster_id)
        );
    }

    #[test]
    fn test_cluster_not_found() {
        let conn = test_conn();
        assert_eq!(
            lookup_error(add_node(&conn, "nope", "h", "h").unwrap_err()),
            LookupError::ClusterNotFound("nope".to_string())
        );
        assert_eq!(
            lookup_error(cluster_manage_host(&conn, "nope").unwrap_err()),
            LookupError::ClusterNotFound("nope".to_string())
        );
    }

    #[test]
    fn test_duplicate_volume_name_rejected() {
        let conn = test_conn();
        let cluster = create_cluster(&conn).unwrap();
        create_volume(&conn, "vol_1", &cluster.cluster_id).unwrap();
        assert!(create_volume(&conn, "vol_1", &cluster.cluster_id).is_err());

        assert_eq!(list_volumes(&conn).unwrap().len(), 1);
        assert_eq!(list_clusters(&conn).unwrap().len(), 1);
    }
}
