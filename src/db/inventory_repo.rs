// src/db/inventory_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use rust_decimal::Decimal;
use uuid::Uuid;
use crate::{
    common::error::{map_unique_violation, AppError},
    models::inventory::{
        Category, InventoryTransaction, LowStockEntry, NewLedgerEntry, NewProduct, Product,
        ProductUpdate, Supplier, SupplierUpdate,
    },
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura" (Getters)
    // ---
    // Funções de leitura simples usam a pool principal.

    pub async fn get_all_products(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn get_low_stock(&self) -> Result<Vec<LowStockEntry>, AppError> {
        let entries = sqlx::query_as::<_, LowStockEntry>(
            r#"
            SELECT id, sku, name, stock, min_stock
            FROM products
            WHERE active AND kind <> 'service' AND stock <= min_stock
            ORDER BY stock ASC, name ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    pub async fn get_all_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn get_all_suppliers(&self) -> Result<Vec<Supplier>, AppError> {
        let suppliers = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(suppliers)
    }

    /// Livro-razão completo, mais recente primeiro.
    pub async fn get_transactions(&self) -> Result<Vec<InventoryTransaction>, AppError> {
        let rows = sqlx::query_as::<_, InventoryTransaction>(
            "SELECT * FROM inventory_transactions ORDER BY created_at DESC, id DESC",
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Linhas de um documento. O código é comparado sem diferenciar maiúsculas.
    pub async fn get_voucher_lines(&self, code: &str) -> Result<Vec<InventoryTransaction>, AppError> {
        let rows = sqlx::query_as::<_, InventoryTransaction>(
            "SELECT * FROM inventory_transactions WHERE LOWER(code) = LOWER($1) ORDER BY created_at ASC, id ASC",
        )
            .bind(code)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ---
    // Funções de "Escrita" (Transacionais)
    // ---

    /// Lê e trava os produtos, sempre na ordem do id (evita deadlock entre vendas).
    pub async fn lock_products<'e, E>(
        &self,
        executor: E,
        product_ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
            .bind(product_ids)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
            .bind(name)
            .bind(description)
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, |_| Some(AppError::CategoryNameAlreadyExists(name.to_string()))))
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        input: &NewProduct,
        initial_stock: i32,
        initial_cost: Decimal,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                sku, name, category_id, sale_price, cost_price, stock, min_stock,
                unit, kind, warranty_months, is_serialized, vat_rate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
            .bind(&input.sku)
            .bind(&input.name)
            .bind(input.category_id)
            .bind(input.sale_price)
            .bind(initial_cost)
            .bind(initial_stock)
            .bind(input.min_stock)
            .bind(&input.unit)
            .bind(input.kind)
            .bind(input.warranty_months)
            .bind(input.is_serialized)
            .bind(input.vat_rate)
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, |_| Some(AppError::SkuAlreadyExists(input.sku.clone()))))
    }

    /// Atualização parcial: campos ausentes mantêm o valor atual.
    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        input: &ProductUpdate,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                sku             = COALESCE($2, sku),
                name            = COALESCE($3, name),
                category_id     = COALESCE($4, category_id),
                sale_price      = COALESCE($5, sale_price),
                min_stock       = COALESCE($6, min_stock),
                unit            = COALESCE($7, unit),
                kind            = COALESCE($8, kind),
                warranty_months = COALESCE($9, warranty_months),
                is_serialized   = COALESCE($10, is_serialized),
                vat_rate        = COALESCE($11, vat_rate),
                active          = COALESCE($12, active),
                updated_at      = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(product_id)
            .bind(input.sku.as_deref())
            .bind(input.name.as_deref())
            .bind(input.category_id)
            .bind(input.sale_price)
            .bind(input.min_stock)
            .bind(input.unit.as_deref())
            .bind(input.kind)
            .bind(input.warranty_months)
            .bind(input.is_serialized)
            .bind(input.vat_rate)
            .bind(input.active)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                let sku = input.sku.clone().unwrap_or_default();
                map_unique_violation(e, |_| Some(AppError::SkuAlreadyExists(sku)))
            })
    }

    /// Exclusão física. O livro-razão e os pedidos guardam cópias próprias.
    pub async fn delete_product<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Grava o novo saldo e o custo calculados pelo livro-razão.
    pub async fn update_stock_and_cost<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        stock: i32,
        cost_price: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE products
            SET stock = $2, cost_price = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
            .bind(product_id)
            .bind(stock)
            .bind(cost_price)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Registra uma movimentação no livro-razão (imutável).
    pub async fn record_stock_movement<'e, E>(
        &self,
        executor: E,
        entry: &NewLedgerEntry,
        staff_name: &str,
    ) -> Result<InventoryTransaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, InventoryTransaction>(
            r#"
            INSERT INTO inventory_transactions (
                code, product_id, product_name, sku, movement_type, quantity, balance,
                old_stock, new_stock, unit_price, note, reference_id, supplier_name,
                receiver_name, reference_number, reference_date, staff_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
            .bind(&entry.code)
            .bind(entry.product_id)
            .bind(&entry.product_name)
            .bind(&entry.sku)
            .bind(entry.movement_type)
            .bind(entry.quantity)
            .bind(entry.balance())
            .bind(entry.old_stock)
            .bind(entry.new_stock)
            .bind(entry.unit_price)
            .bind(entry.note.as_deref())
            .bind(entry.reference_id)
            .bind(entry.voucher.supplier_name.as_deref())
            .bind(entry.voucher.receiver_name.as_deref())
            .bind(entry.voucher.reference_number.as_deref())
            .bind(entry.voucher.reference_date)
            .bind(staff_name)
            .fetch_one(executor)
            .await?;

        Ok(movement)
    }

    // ---
    // Fornecedores
    // ---

    /// Existe outro fornecedor com esse nome (sem diferenciar maiúsculas)?
    pub async fn supplier_name_taken<'e, E>(
        &self,
        executor: E,
        name: &str,
        except_id: Option<Uuid>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM suppliers
                WHERE LOWER(name) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
            .bind(name)
            .bind(except_id)
            .fetch_one(executor)
            .await?;
        Ok(taken)
    }

    pub async fn create_supplier<'e, E>(
        &self,
        executor: E,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        address: Option<&str>,
        note: Option<&str>,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (name, phone, email, address, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
            .bind(name)
            .bind(phone)
            .bind(email)
            .bind(address)
            .bind(note)
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, |_| Some(AppError::DuplicateSupplierName(name.to_string()))))
    }

    pub async fn update_supplier<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
        input: &SupplierUpdate,
    ) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers SET
                name       = COALESCE($2, name),
                phone      = COALESCE($3, phone),
                email      = COALESCE($4, email),
                address    = COALESCE($5, address),
                note       = COALESCE($6, note),
                active     = COALESCE($7, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(supplier_id)
            .bind(input.name.as_deref())
            .bind(input.phone.as_deref())
            .bind(input.email.as_deref())
            .bind(input.address.as_deref())
            .bind(input.note.as_deref())
            .bind(input.active)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                let name = input.name.clone().unwrap_or_default();
                map_unique_violation(e, |_| Some(AppError::DuplicateSupplierName(name)))
            })
    }
}
