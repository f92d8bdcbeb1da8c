// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

/// Catalog reconciliation settings.
#[derive(Debug, Clone, Default)]
pub struct ReconcileConfig {
	/// Reconcile the catalog before serving `check` and `assign-role`.
	pub on_startup: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileConfigLayer {
	#[serde(default)]
	pub on_startup: Option<bool>,
}

impl ReconcileConfigLayer {
	pub fn merge(&mut self, other: ReconcileConfigLayer) {
		if other.on_startup.is_some() {
			self.on_startup = other.on_startup;
		}
	}

	pub fn finalize(self) -> ReconcileConfig {
		ReconcileConfig {
			on_startup: self.on_startup.unwrap_or(false),
		}
	}
}
