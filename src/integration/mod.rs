// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wiring of one configured switcher.
//!
//! [`MatrixIntegration::setup`] performs the whole lifecycle in order:
//!
//! 1. build the HTTP client from the entry's API URL
//! 2. start the [`StateSynchronizer`] (fails if the first poll fails)
//! 3. route the broker's `serial/status` topic into the push queue
//! 4. create the sensors and selectors
//!
//! [`MatrixIntegration::unload`] reverses it.

mod config;

pub use config::{
    BridgeConfig, CONF_API_URL, ConfigEntry, ConfigFlow, DEFAULT_API_URL, ENTRY_TITLE, FlowStep,
    FormField, MqttSettings, UserInput,
};

#[cfg(feature = "mqtt")]
pub use lifecycle::MatrixIntegration;

#[cfg(feature = "mqtt")]
mod lifecycle {
    use super::ConfigEntry;

    use crate::entity::{
        CommandOutcome, EdidSelect, EntityContext, OutputSelect, SensorKind, StatusSensor,
    };
    use crate::error::Result;
    use crate::protocol::{HttpConfig, MqttBroker};
    use crate::sync::{STATUS_TOPIC, StateSynchronizer, SyncConfig};
    use crate::types::{InputPort, OutputPort};

    /// A running switcher integration.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ez_matrix::integration::{ConfigEntry, MatrixIntegration};
    /// use ez_matrix::protocol::MqttBroker;
    ///
    /// # async fn example() -> ez_matrix::Result<()> {
    /// let broker = MqttBroker::builder().host("192.168.1.10").build().await?;
    /// let entry = ConfigEntry::new("http://192.168.1.100:8000");
    ///
    /// let matrix = MatrixIntegration::setup(&entry, &broker).await?;
    /// matrix.select_output(1, "Input 3").await?;
    ///
    /// matrix.unload().await;
    /// # Ok(())
    /// # }
    /// ```
    #[derive(Debug)]
    pub struct MatrixIntegration {
        entry: ConfigEntry,
        broker: MqttBroker,
        context: EntityContext,
        sensors: Vec<StatusSensor>,
        output_selects: Vec<OutputSelect>,
        edid_selects: Vec<EdidSelect>,
    }

    impl MatrixIntegration {
        /// Sets up the integration with default timings.
        ///
        /// # Errors
        ///
        /// Returns `Error::UpdateFailed` if the device cannot be polled,
        /// or a protocol error if the URL is invalid or the subscription
        /// fails. Nothing keeps running after an error.
        pub async fn setup(entry: &ConfigEntry, broker: &MqttBroker) -> Result<Self> {
            Self::setup_with(
                entry,
                broker,
                HttpConfig::new(entry.api_url()),
                SyncConfig::default(),
            )
            .await
        }

        /// Sets up the integration with explicit HTTP and sync settings.
        ///
        /// # Errors
        ///
        /// See [`setup`](Self::setup).
        pub async fn setup_with(
            entry: &ConfigEntry,
            broker: &MqttBroker,
            http: HttpConfig,
            sync_config: SyncConfig,
        ) -> Result<Self> {
            let client = http.into_client()?;
            tracing::info!(
                entry_id = entry.entry_id(),
                url = client.base_url(),
                "Setting up EZ Matrix"
            );

            let sync = StateSynchronizer::start(client.clone(), sync_config).await?;

            if let Err(e) = broker.subscribe(STATUS_TOPIC, sync.push_sender()).await {
                sync.shutdown();
                return Err(e.into());
            }

            let context = EntityContext::new(entry.entry_id(), sync, client);

            let sensors = SensorKind::ALL
                .into_iter()
                .map(|kind| StatusSensor::new(context.clone(), kind))
                .collect();
            let output_selects = OutputPort::all()
                .map(|output| OutputSelect::new(context.clone(), output))
                .collect();
            let edid_selects = InputPort::all()
                .map(|input| EdidSelect::new(context.clone(), input))
                .collect();

            Ok(Self {
                entry: entry.clone(),
                broker: broker.clone(),
                context,
                sensors,
                output_selects,
                edid_selects,
            })
        }

        /// Returns the config entry.
        #[must_use]
        pub fn entry(&self) -> &ConfigEntry {
            &self.entry
        }

        /// Returns the synchronizer.
        #[must_use]
        pub fn sync(&self) -> &StateSynchronizer {
            self.context.sync()
        }

        /// Returns the status sensors.
        #[must_use]
        pub fn sensors(&self) -> &[StatusSensor] {
            &self.sensors
        }

        /// Returns the output selectors, output 1 first.
        #[must_use]
        pub fn output_selects(&self) -> &[OutputSelect] {
            &self.output_selects
        }

        /// Returns the EDID selectors, input 1 first.
        #[must_use]
        pub fn edid_selects(&self) -> &[EdidSelect] {
            &self.edid_selects
        }

        /// Returns the selector for an output.
        #[must_use]
        pub fn output_select(&self, output: OutputPort) -> Option<&OutputSelect> {
            self.output_selects.iter().find(|s| s.output() == output)
        }

        /// Returns the selector for an input.
        #[must_use]
        pub fn edid_select(&self, input: InputPort) -> Option<&EdidSelect> {
            self.edid_selects.iter().find(|s| s.input() == input)
        }

        /// Returns the sensor of a kind.
        #[must_use]
        pub fn sensor(&self, kind: SensorKind) -> Option<&StatusSensor> {
            self.sensors.iter().find(|s| s.kind() == kind)
        }

        /// Routes the input named by `option` to output `output` (1-2).
        ///
        /// # Errors
        ///
        /// Returns `Error::Value` if the output number or option is invalid.
        pub async fn select_output(&self, output: u8, option: &str) -> Result<CommandOutcome> {
            let output = OutputPort::new(output)?;
            let select = OutputSelect::new(self.context.clone(), output);
            Ok(select.select_option(option).await?)
        }

        /// Sets the EDID index of input `input` (1-4).
        ///
        /// # Errors
        ///
        /// Returns `Error::Value` if the input number or option is invalid.
        pub async fn select_edid(&self, input: u8, option: &str) -> Result<CommandOutcome> {
            let input = InputPort::new(input)?;
            let select = EdidSelect::new(self.context.clone(), input);
            Ok(select.select_option(option).await?)
        }

        /// Stops polling and removes the push subscription.
        ///
        /// The broker connection itself stays open.
        pub async fn unload(self) {
            self.context.sync().shutdown();
            self.broker.unsubscribe(STATUS_TOPIC).await;
            tracing::info!(entry_id = self.entry.entry_id(), "Unloaded EZ Matrix");
        }
    }
}
