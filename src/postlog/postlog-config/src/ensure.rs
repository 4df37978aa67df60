/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::{field::FieldStorage, Config};

impl Config {
    /// Check the values which cannot be expressed by the types.
    ///
    /// # Errors
    ///
    /// * the schedule period is zero
    /// * the progress channel size is zero
    /// * the mysql pool has no connection
    /// * a service is both a queue and a delivery service
    pub fn ensure(config: Self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.schedule.period.is_zero(),
            "The period of the schedule cannot be zero"
        );

        anyhow::ensure!(
            config.progress.channel_size != 0,
            "The size of the progress channel cannot be zero"
        );

        if let FieldStorage::Mysql { connections, .. } = &config.storage {
            anyhow::ensure!(*connections != 0, "The mysql pool needs at least one connection");
        }

        if let Some(service) = config
            .correlation
            .queue_services
            .iter()
            .find(|s| config.correlation.delivery_services.contains(s))
        {
            anyhow::bail!("The service '{service}' cannot be both a queue and a delivery service");
        }

        Ok(config)
    }
}
