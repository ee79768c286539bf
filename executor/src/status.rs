//! Parsing of `gluster volume geo-replication ... status --xml` output.
//!
//! The parse is structural only: values are kept exactly as the CLI reports
//! them (including `N/A`), unknown elements are ignored, and missing
//! elements become empty strings.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::{GeoRepError, Result};

// ============================================================================
// Status tree
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub volumes: Vec<VolumeStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeStatus {
    pub name: String,
    pub sessions: Vec<SessionStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_slave: String,
    pub pairs: Vec<PairStatus>,
}

/// One master brick to slave node link. Field names follow the XML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairStatus {
    pub master_node: String,
    pub master_brick: String,
    pub slave_user: String,
    pub slave: String,
    pub slave_node: String,
    pub status: String,
    pub crawl_status: String,
    pub entry: String,
    pub data: String,
    pub meta: String,
    pub failures: String,
    pub checkpoint_completed: String,
    pub master_node_uuid: String,
    pub last_synced: String,
    pub checkpoint_time: String,
    pub checkpoint_completion_time: String,
}

/// The `cliOutput` envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOutput {
    pub op_ret: i32,
    pub op_errno: i32,
    pub op_errstr: String,
    pub geo_rep: ClusterStatus,
}

impl ClusterStatus {
    pub fn volume(&self, name: &str) -> Option<&VolumeStatus> {
        self.volumes.iter().find(|v| v.name == name)
    }

    /// Sessions of `volume`.
    ///
    /// A lone entry without a name (the bare session list some CLI versions
    /// print for a volume-scoped query) is taken as the queried volume.
    /// Nothing matching yields no sessions.
    pub fn into_sessions(self, volume: &str) -> Vec<SessionStatus> {
        let lone_unnamed = self.volumes.len() == 1 && self.volumes[0].name.is_empty();

        self.volumes
            .into_iter()
            .find(|v| v.name == volume || lone_unnamed)
            .map(|v| v.sessions)
            .unwrap_or_default()
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct WireOutput {
    #[serde(rename = "opRet", default, deserialize_with = "lenient_i32")]
    op_ret: i32,
    #[serde(rename = "opErrno", default, deserialize_with = "lenient_i32")]
    op_errno: i32,
    #[serde(rename = "opErrstr", default)]
    op_errstr: String,
    #[serde(rename = "geoRep", default)]
    geo_rep: WireGeoRep,
}

/// Integer element text; empty or blank reads as 0
fn lenient_i32<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse().map_err(serde::de::Error::custom)
}

/// Holds either a list of volumes or a single volume's bare session list
#[derive(Debug, Default, Deserialize)]
struct WireGeoRep {
    #[serde(rename = "volume", default)]
    volumes: Vec<WireVolume>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sessions: Option<WireSessions>,
}

#[derive(Debug, Default, Deserialize)]
struct WireVolume {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sessions: WireSessions,
}

#[derive(Debug, Default, Deserialize)]
struct WireSessions {
    #[serde(rename = "session", default)]
    sessions: Vec<WireSession>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSession {
    #[serde(default)]
    session_slave: String,
    #[serde(rename = "pair", default)]
    pairs: Vec<PairStatus>,
}

impl From<WireSessions> for Vec<SessionStatus> {
    fn from(wire: WireSessions) -> Self {
        wire.sessions
            .into_iter()
            .map(|s| SessionStatus {
                session_slave: s.session_slave,
                pairs: s.pairs,
            })
            .collect()
    }
}

impl From<WireGeoRep> for ClusterStatus {
    fn from(wire: WireGeoRep) -> Self {
        let mut volumes: Vec<VolumeStatus> = wire
            .volumes
            .into_iter()
            .map(|v| VolumeStatus {
                name: v.name,
                sessions: v.sessions.into(),
            })
            .collect();

        if let Some(sessions) = wire.sessions {
            volumes.push(VolumeStatus {
                name: wire.name.unwrap_or_default(),
                sessions: sessions.into(),
            });
        }

        ClusterStatus { volumes }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse one status reply; `target` names the host or volume in errors
pub fn parse_cli_output(raw: &str, target: &str) -> Result<CliOutput> {
    let wire: WireOutput =
        quick_xml::de::from_str(raw.trim_start()).map_err(|e| GeoRepError::MalformedResponse {
            target: target.to_string(),
            detail: e.to_string(),
        })?;

    if wire.op_ret != 0 {
        warn!(
            "Status for {} reported opRet={} opErrno={}: {}",
            target, wire.op_ret, wire.op_errno, wire.op_errstr
        );
    }

    let output = CliOutput {
        op_ret: wire.op_ret,
        op_errno: wire.op_errno,
        op_errstr: wire.op_errstr,
        geo_rep: wire.geo_rep.into(),
    };
    debug!(
        "Parsed status for {}: {} volume(s)",
        target,
        output.geo_rep.volumes.len()
    );
    Ok(output)
}

/// Parse the reply of the first command of a batch
pub fn parse_first(output: &[String], target: &str) -> Result<CliOutput> {
    let raw = output.first().ok_or_else(|| GeoRepError::MalformedResponse {
        target: target.to_string(),
        detail: "no output".to_string(),
    })?;
    parse_cli_output(raw, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOBAL: &str = include_str!("../tests/fixtures/global_status.xml");
    const VOLUME: &str = include_str!("../tests/fixtures/volume_status.xml");

    #[test]
    fn test_parse_global_status() {
        let out = parse_cli_output(GLOBAL, "host").unwrap();
        let volumes = &out.geo_rep.volumes;

        assert_eq!(out.op_ret, 0);
        assert_eq!(out.op_errstr, "");
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].name, "vol_1");
        assert_eq!(volumes[0].sessions.len(), 1);
        assert_eq!(volumes[0].sessions[0].pairs.len(), 2);
        assert_eq!(volumes[1].name, "vol_2");
        assert_eq!(volumes[1].sessions.len(), 1);
        assert_eq!(volumes[1].sessions[0].pairs.len(), 1);
    }

    #[test]
    fn test_pair_fields_passed_through() {
        let out = parse_cli_output(VOLUME, "vol_1").unwrap();
        let session = &out.geo_rep.volumes[0].sessions[0];

        assert_eq!(
            session.session_slave,
            "b4927246-9c3e-4a84-bbc5-dd6219a3594a:ssh://1.2.3.4::vol_1:6ce8b0c2-1d7f-4e3d-b9be-a15794ff0a71"
        );

        let passive = &session.pairs[0];
        assert_eq!(passive.status, "Passive");
        assert_eq!(passive.crawl_status, "N/A");
        assert_eq!(passive.last_synced, "N/A");
        assert_eq!(passive.master_node_uuid, "e7615c4c-ec61-49e8-8346-4dc1a62c6923");

        let active = &session.pairs[1];
        assert_eq!(active.status, "Active");
        assert_eq!(active.crawl_status, "Changelog Crawl");
        assert_eq!(active.entry, "0");
        assert_eq!(active.slave, "ssh://1.2.3.4::vol_1");
        assert_eq!(active.last_synced, "2017-09-04 15:03:26");
    }

    #[test]
    fn test_bare_session_list() {
        let raw = r#"<cliOutput>
            <opRet>0</opRet><opErrno>0</opErrno><opErrstr/>
            <geoRep>
                <name>vol_1</name>
                <sessions>
                    <session>
                        <session_slave>s1</session_slave>
                        <pair><status>Active</status></pair>
                    </session>
                    <session>
                        <session_slave>s2</session_slave>
                    </session>
                </sessions>
            </geoRep>
        </cliOutput>"#;

        let status = parse_cli_output(raw, "vol_1").unwrap().geo_rep;
        assert_eq!(status.volumes.len(), 1);
        assert_eq!(status.volumes[0].name, "vol_1");

        let sessions = status.into_sessions("vol_1");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].pairs[0].status, "Active");
        assert_eq!(sessions[0].pairs[0].master_node, "");
        assert!(sessions[1].pairs.is_empty());
    }

    #[test]
    fn test_unknown_and_missing_elements() {
        let raw = r#"<cliOutput>
            <opRet>0</opRet>
            <future>ignored</future>
            <geoRep><volume><name>vol_9</name><extra>1</extra>
                <sessions><session><pair><status>Faulty</status><new_field>x</new_field></pair></session></sessions>
            </volume></geoRep>
        </cliOutput>"#;

        let out = parse_cli_output(raw, "host").unwrap();
        assert_eq!(out.op_errno, 0);
        let pair = &out.geo_rep.volumes[0].sessions[0].pairs[0];
        assert_eq!(pair.status, "Faulty");
        assert_eq!(pair.slave_node, "");
    }

    #[test]
    fn test_empty_geo_rep() {
        let raw = "<cliOutput><opRet>0</opRet><opErrno>0</opErrno><opErrstr/><geoRep/></cliOutput>";
        let status = parse_cli_output(raw, "host").unwrap().geo_rep;

        assert!(status.volumes.is_empty());
        assert!(status.into_sessions("vol_1").is_empty());
    }

    #[test]
    fn test_empty_and_padded_return_codes() {
        let raw = "<cliOutput><opRet>0</opRet><opErrno/><opErrstr/><geoRep/></cliOutput>";
        let out = parse_cli_output(raw, "host").unwrap();
        assert_eq!(out.op_ret, 0);
        assert_eq!(out.op_errno, 0);

        let raw = "<cliOutput><opRet></opRet><opErrno>  </opErrno><geoRep/></cliOutput>";
        let out = parse_cli_output(raw, "host").unwrap();
        assert_eq!(out.op_ret, 0);
        assert_eq!(out.op_errno, 0);

        let raw = "<cliOutput><opRet> -1 </opRet><opErrno>\n 2\n</opErrno><geoRep/></cliOutput>";
        let out = parse_cli_output(raw, "host").unwrap();
        assert_eq!(out.op_ret, -1);
        assert_eq!(out.op_errno, 2);
    }

    #[test]
    fn test_into_sessions_matches_by_name() {
        let status = parse_cli_output(GLOBAL, "host").unwrap().geo_rep;

        assert!(status.volume("vol_2").is_some());
        assert_eq!(status.clone().into_sessions("vol_2")[0].pairs.len(), 1);
        assert!(status.into_sessions("vol_3").is_empty());
    }

    #[test]
    fn test_malformed_output_names_target() {
        let err = parse_cli_output("<cliOutput><opRet>0</opRet><geoRep>", "node1:22").unwrap_err();
        match err {
            GeoRepError::MalformedResponse { target, .. } => assert_eq!(target, "node1:22"),
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(parse_cli_output("<cliOutput><opRet>zero</opRet></cliOutput>", "vol_1").is_err());

        assert!(matches!(
            parse_first(&[], "vol_1").unwrap_err(),
            GeoRepError::MalformedResponse { .. }
        ));
    }
}
