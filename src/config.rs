// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{
        CounterRepository, CrmRepository, GiftRepository, InventoryRepository, OrderRepository,
        WarrantyRepository,
    },
    services::{
        counter_service::CounterService, crm_service::CrmService, gift_service::GiftService,
        inventory_service::InventoryService, order_service::OrderService,
        report_service::ReportService, stock_voucher_service::StockVoucherService,
        warranty_service::WarrantyService,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub tx_max_retries: u32,
}

impl Settings {
    /// Lê `.env` (se existir) e as variáveis de ambiente.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().with_context(|| format!("DB_MAX_CONNECTIONS inválido: {v}"))?,
            None => 5,
        };
        let tx_max_retries = match lookup("TX_MAX_RETRIES") {
            Some(v) => v.parse().with_context(|| format!("TX_MAX_RETRIES inválido: {v}"))?,
            None => 3,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections,
            tx_max_retries,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub inventory_service: InventoryService,
    pub stock_voucher_service: StockVoucherService,
    pub order_service: OrderService,
    pub counter_service: CounterService,
    pub crm_service: CrmService,
    pub gift_service: GiftService,
    pub warranty_service: WarrantyService,
    pub report_service: ReportService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, settings))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, settings: &Settings) -> Self {
        let retries = settings.tx_max_retries;

        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let crm_repo = CrmRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let gift_repo = GiftRepository::new(db_pool.clone());
        let warranty_repo = WarrantyRepository::new(db_pool.clone());
        let counter_repo = CounterRepository::new(db_pool.clone());

        let counter_service = CounterService::new(counter_repo, db_pool.clone(), retries);

        Self {
            inventory_service: InventoryService::new(inventory_repo.clone(), db_pool.clone()),
            stock_voucher_service: StockVoucherService::new(
                inventory_repo.clone(),
                counter_service.clone(),
                db_pool.clone(),
                retries,
            ),
            order_service: OrderService::new(
                order_repo.clone(),
                inventory_repo.clone(),
                crm_repo.clone(),
                gift_repo.clone(),
                warranty_repo.clone(),
                counter_service.clone(),
                db_pool.clone(),
                retries,
            ),
            crm_service: CrmService::new(crm_repo, db_pool.clone()),
            gift_service: GiftService::new(gift_repo, inventory_repo.clone(), db_pool.clone()),
            warranty_service: WarrantyService::new(warranty_repo, inventory_repo.clone(), db_pool.clone(), retries),
            report_service: ReportService::new(order_repo, inventory_repo),
            counter_service,
            jwt_secret: settings.jwt_secret.clone(),
            db_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_applied() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/loja"),
            ("JWT_SECRET", "s3cr3t"),
        ]))
        .unwrap();

        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.db_max_connections, 5);
        assert_eq!(settings.tx_max_retries, 3);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/loja"),
            ("JWT_SECRET", "s3cr3t"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DB_MAX_CONNECTIONS", "20"),
            ("TX_MAX_RETRIES", "7"),
        ]))
        .unwrap();

        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.db_max_connections, 20);
        assert_eq!(settings.tx_max_retries, 7);
    }

    #[test]
    fn missing_secret_fails() {
        let err = Settings::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn bad_number_fails() {
        let result = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("TX_MAX_RETRIES", "muitos"),
        ]));
        assert!(result.is_err());
    }
}
