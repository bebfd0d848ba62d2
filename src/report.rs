// Copyright (c) 2025 - Cowboy AI, Inc.
//! Allocation outcome reports
//!
//! Every allocation attempt, successful or not, yields one
//! [`AllocationReport`]. It serializes to the JSON result file and renders
//! as the plain-text "CIDR Allocation Report".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::allocation::{KubernetesAllocation, NormalAllocation};
use crate::domain::{AllocationRole, CidrBlock, ResourceClass};
use crate::errors::AllocationError;

const RULE_WIDTH: usize = 40;

/// Outcome of an allocation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Error,
}

/// One allocated block and the role it was recorded with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedBlock {
    pub block: CidrBlock,
    pub role: AllocationRole,
}

/// Result of one allocation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub status: ReportStatus,
    #[serde(rename = "type")]
    pub class: ResourceClass,
    pub project: Option<String>,
    pub host_network: Option<String>,
    /// Available block the allocation was carved from
    pub original_cidr: Option<CidrBlock>,
    pub allocated_cidrs: Vec<ReportedBlock>,
    /// Sibling blocks returned to the pool
    pub released_cidrs: Vec<CidrBlock>,
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AllocationReport {
    pub fn normal(allocation: &NormalAllocation, attempts: u32) -> Self {
        Self {
            status: ReportStatus::Success,
            class: ResourceClass::Normal,
            project: Some(allocation.project.clone()),
            host_network: Some(allocation.host_network.clone()),
            original_cidr: Some(allocation.parent),
            allocated_cidrs: vec![ReportedBlock {
                block: allocation.allocated,
                role: AllocationRole::Subnet,
            }],
            released_cidrs: allocation.remaining_siblings.clone(),
            attempts,
            timestamp: Utc::now(),
            error_kind: None,
            message: None,
        }
    }

    pub fn kubernetes(allocation: &KubernetesAllocation, attempts: u32) -> Self {
        let allocated_cidrs = [
            (allocation.primary, AllocationRole::Primary),
            (allocation.services, AllocationRole::Services),
            (allocation.pods, AllocationRole::Pods),
        ]
        .into_iter()
        .map(|(block, role)| ReportedBlock { block, role })
        .collect();

        Self {
            status: ReportStatus::Success,
            class: ResourceClass::Kubernetes,
            project: Some(allocation.project.clone()),
            host_network: Some(allocation.host_network.clone()),
            original_cidr: Some(allocation.parent),
            allocated_cidrs,
            released_cidrs: allocation.released.clone(),
            attempts,
            timestamp: Utc::now(),
            error_kind: None,
            message: None,
        }
    }

    /// Report of a failed attempt; identity fields are kept when known
    pub fn failure(
        class: ResourceClass,
        project: Option<String>,
        host_network: Option<String>,
        error: &AllocationError,
        attempts: u32,
    ) -> Self {
        Self {
            status: ReportStatus::Error,
            class,
            project,
            host_network,
            original_cidr: None,
            allocated_cidrs: Vec::new(),
            released_cidrs: Vec::new(),
            attempts,
            timestamp: Utc::now(),
            error_kind: Some(error.kind().to_string()),
            message: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }

    /// Render the plain-text report
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        let or_na = |value: Option<&str>| value.unwrap_or("N/A").to_string();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "CIDR Allocation Report");
        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, "Date: {}", self.timestamp.to_rfc3339());
        let _ = writeln!(out, "Request Type: {}", self.class);
        let _ = writeln!(out, "Project: {}", or_na(self.project.as_deref()));
        let _ = writeln!(out, "Host Network: {}", or_na(self.host_network.as_deref()));
        let _ = writeln!(
            out,
            "Original CIDR: {}",
            self.original_cidr
                .map(|block| block.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        );
        let _ = writeln!(
            out,
            "Status: {}",
            match self.status {
                ReportStatus::Success => "SUCCESS",
                ReportStatus::Error => "ERROR",
            }
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Allocated CIDRs:");
        let _ = writeln!(out, "{}", light);

        match self.status {
            ReportStatus::Success => {
                for (idx, entry) in self.allocated_cidrs.iter().enumerate() {
                    let _ = writeln!(out, "{}. {} ({})", idx + 1, entry.block, entry.role);
                }
                if !self.released_cidrs.is_empty() {
                    let _ = writeln!(out);
                    let _ = writeln!(out, "Returned to pool:");
                    let _ = writeln!(out, "{}", light);
                    for block in &self.released_cidrs {
                        let _ = writeln!(out, "- {}", block);
                    }
                }
                let _ = writeln!(out);
                let _ = writeln!(out, "Pool updated successfully in {} pool", self.class);
            }
            ReportStatus::Error => {
                let _ = writeln!(
                    out,
                    "ERROR: {}",
                    self.message.as_deref().unwrap_or("Unknown error")
                );
            }
        }

        if self.attempts > 1 {
            let _ = writeln!(out, "Attempts: {}", self.attempts);
        }

        out
    }
}
