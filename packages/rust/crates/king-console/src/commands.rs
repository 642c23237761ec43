//! Subcommand runners. Each prints one JSON document (or one per fetched
//! page for `objects`) on stdout.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use king_objects::{
    BackendEndpoints, Catalog, FetchOutcome, ObjectRetrievalEngine, QueryTarget, Resolution,
};
use king_transport::{HostBridge, HostEnvironment, NativeHttpBridge, Transport, select_transport};
use king_types::{ConnectionRef, FilterLogic, FilterSet};
use serde::Serialize;

use king_console::ConsoleSettings;

use crate::cli::{Command, ConnectionArgs};

/// Transport and endpoints shared by every subcommand.
pub(crate) struct Runtime {
    transport: Arc<dyn Transport>,
    endpoints: BackendEndpoints,
    settings: ConsoleSettings,
}

impl Runtime {
    /// Probe the host once and pick the transport.
    pub(crate) fn new(settings: ConsoleSettings, backend_url: Option<String>) -> Result<Self> {
        let env = HostEnvironment::probe();
        let bridge = env.is_sandboxed().then(|| {
            Arc::new(NativeHttpBridge::new(settings.bridge_retry_policy()))
                as Arc<dyn HostBridge>
        });
        let transport = select_transport(env, bridge)?;
        let base_url = backend_url.unwrap_or_else(|| settings.backend_url());
        let endpoints = BackendEndpoints::new(&base_url)?;
        tracing::debug!(
            event = "console.runtime.ready",
            backend_url = %endpoints.base_url(),
            transport = ?transport.kind(),
        );
        Ok(Self {
            transport,
            endpoints,
            settings,
        })
    }

    fn catalog(&self) -> Catalog {
        Catalog::new(
            Arc::clone(&self.transport),
            self.endpoints.clone(),
            self.settings.request_timeout(),
        )
    }

    async fn connection(&self, args: ConnectionArgs) -> Result<ConnectionRef> {
        let connection = if let Some(id) = args.connection_id {
            self.catalog().get_connection(&id).await?
        } else {
            let Some(address) = args.address.filter(|a| !a.trim().is_empty()) else {
                bail!("either --connection-id or --address is required");
            };
            ConnectionRef {
                id: String::new(),
                display_name: args.name,
                scheme: args.scheme,
                host_address: address,
                api_key: args.api_key.filter(|k| !k.is_empty()),
            }
        };
        tracing::debug!(
            event = "console.connection.resolved",
            connection_id = %connection.id,
            cluster = %connection.base_url(),
        );
        Ok(connection)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageOutput {
    page: usize,
    search_mode: bool,
    capped: bool,
    has_more: bool,
    total: usize,
    #[serde(flatten)]
    resolution: Resolution,
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run one subcommand.
pub(crate) async fn run(runtime: &Runtime, command: Command) -> Result<()> {
    match command {
        Command::Connections => print_json(&runtime.catalog().list_connections().await?),
        Command::Connection { id } => print_json(&runtime.catalog().get_connection(&id).await?),
        Command::TestConnection { connection } => {
            let connection = runtime.connection(connection).await?;
            print_json(&runtime.catalog().test_connection(&connection).await?)
        }
        Command::Classes { connection } => {
            let connection = runtime.connection(connection).await?;
            print_json(&runtime.catalog().list_classes(&connection).await?)
        }
        Command::Properties {
            connection,
            class_name,
        } => {
            let connection = runtime.connection(connection).await?;
            print_json(
                &runtime
                    .catalog()
                    .class_properties(&connection, &class_name)
                    .await?,
            )
        }
        Command::Objects {
            connection,
            class_name,
            filters,
            logic,
            pages,
            search,
            display_page,
            raw,
        } => {
            let connection = runtime.connection(connection).await?;
            let engine = ObjectRetrievalEngine::new(
                Arc::clone(&runtime.transport),
                runtime.endpoints.clone(),
                runtime.settings.engine_options(),
            );
            engine
                .select_target(QueryTarget::new(connection, class_name))
                .await;
            engine
                .set_filters(FilterSet::new(filters, FilterLogic::normalize(&logic)))
                .await;
            let print_pages = search.is_none() && raw.is_none() && display_page.is_none();
            walk_pages(&engine, pages.max(1), print_pages).await?;

            if let Some(id) = raw {
                let page = engine.page().await;
                let record = page
                    .records
                    .iter()
                    .find(|record| record.id == id)
                    .ok_or_else(|| anyhow!("object {id} not found in the fetched page"))?;
                println!("{}", record.raw_pretty());
            } else if let Some(query) = search {
                print_json(&Resolution::Ok(engine.search_local(&query).await))?;
            } else if let Some(index) = display_page {
                engine.set_display_page(index).await;
                let page = engine.page().await;
                print_json(&Resolution::Ok(page.visible_records().to_vec()))?;
            }
            Ok(())
        }
    }
}

/// Fetch up to `pages` pages, following the listing cursor.
async fn walk_pages(engine: &ObjectRetrievalEngine, pages: usize, print: bool) -> Result<()> {
    for page in 1..=pages {
        let result = engine.fetch().await;
        let resolution = Resolution::from_fetch(&result);
        let report = match result? {
            FetchOutcome::Applied(report) => report,
            FetchOutcome::Stale => break,
        };
        if print && let Some(resolution) = resolution {
            print_json(&PageOutput {
                page,
                search_mode: report.search_mode,
                capped: report.capped,
                has_more: report.has_more,
                total: report.page.total,
                resolution,
            })?;
        }
        if !report.has_more {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use king_types::Scheme;

    fn explicit_args(address: Option<&str>) -> ConnectionArgs {
        ConnectionArgs {
            connection_id: None,
            address: address.map(ToString::to_string),
            scheme: Scheme::Https,
            api_key: Some(String::new()),
            name: "prod".to_string(),
        }
    }

    #[test]
    fn runtime_prefers_explicit_backend_url() {
        let runtime = Runtime::new(
            ConsoleSettings::default(),
            Some("http://10.1.2.3:5175".to_string()),
        )
        .expect("runtime");
        assert_eq!(runtime.endpoints.base_url(), "http://10.1.2.3:5175/");
        assert_eq!(runtime.settings.engine_options().fetch_page_size, 100);
    }

    #[tokio::test]
    async fn explicit_connection_fields_build_a_connection() {
        let runtime = Runtime::new(
            ConsoleSettings::default(),
            Some("http://127.0.0.1:5175".to_string()),
        )
        .expect("runtime");
        let connection = runtime
            .connection(explicit_args(Some("db.local:8080")))
            .await
            .expect("connection");
        assert_eq!(connection.base_url(), "https://db.local:8080");
        assert_eq!(connection.display_name, "prod");
        assert_eq!(connection.api_key, None);

        let missing = runtime.connection(explicit_args(Some("  "))).await;
        assert!(missing.is_err());
    }
}
