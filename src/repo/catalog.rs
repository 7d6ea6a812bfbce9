use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::Slug;
use crate::model::{Category, CategoryInput, Product, ProductInput};

const PRODUCT_COLUMNS: &str =
    "id, title, description, price, stock, images, category_id, active, created_at, updated_at";

pub struct CategoriesRepo;

impl CategoriesRepo {
    #[tracing::instrument(name = "List categories", skip(executor))]
    pub async fn list<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "select id, name, slug, description, created_at from categories order by name",
        )
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch category", skip(executor))]
    pub async fn fetch<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "select id, name, slug, description, created_at from categories where id=$1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument(name = "Insert category", skip(executor, input))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        input: &CategoryInput,
        slug: &Slug,
    ) -> sqlx::Result<Category> {
        sqlx::query_as::<_, Category>(
            "insert into categories(name, slug, description) values ($1, $2, $3) \
             returning id, name, slug, description, created_at",
        )
        .bind(&input.name)
        .bind(slug.as_ref())
        .bind(&input.description)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument(name = "Update category", skip(executor, input))]
    pub async fn update<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        input: &CategoryInput,
        slug: &Slug,
    ) -> sqlx::Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "update categories set name=$2, slug=$3, description=$4 where id=$1 \
             returning id, name, slug, description, created_at",
        )
        .bind(id)
        .bind(&input.name)
        .bind(slug.as_ref())
        .bind(&input.description)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument(name = "Delete category", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from categories where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct ProductsRepo;

impl ProductsRepo {
    /// List products, optionally only active ones and only those in the category `category`
    #[tracing::instrument(name = "List products", skip(executor))]
    pub async fn list<'con>(
        executor: impl PgExecutor<'con>,
        active_only: bool,
        category: Option<&str>,
    ) -> sqlx::Result<Vec<Product>> {
        let query = format!(
            "select {PRODUCT_COLUMNS} from products p \
             where (p.active or not $1) \
               and ($2::text is null or p.category_id = (select id from categories where slug = $2)) \
             order by p.title"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(active_only)
            .bind(category)
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch product", skip(executor))]
    pub async fn fetch<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<Product>> {
        let query = format!("select {PRODUCT_COLUMNS} from products where id=$1");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Insert product", skip(executor, input))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        input: &ProductInput,
    ) -> sqlx::Result<Product> {
        let query = format!(
            "insert into products(title, description, price, stock, images, category_id, active) \
             values ($1, $2, $3, $4, $5, $6, $7) returning {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.stock)
            .bind(&input.images)
            .bind(input.category_id)
            .bind(input.active)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Update product", skip(executor, input))]
    pub async fn update<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        input: &ProductInput,
    ) -> sqlx::Result<Option<Product>> {
        let query = format!(
            "update products set title=$2, description=$3, price=$4, stock=$5, images=$6, \
             category_id=$7, active=$8, updated_at=now() \
             where id=$1 returning {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.stock)
            .bind(&input.images)
            .bind(input.category_id)
            .bind(input.active)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Set product active flag", skip(executor))]
    pub async fn set_active<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        active: bool,
    ) -> sqlx::Result<Option<Product>> {
        let query = format!(
            "update products set active=$2, updated_at=now() where id=$1 returning {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(active)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Delete product", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from products where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Take `quantity` units out of stock, only if that many are available.
    ///
    /// Returns whether the decrement happened.
    #[tracing::instrument(name = "Decrement product stock", skip(executor))]
    pub async fn decrement_stock<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        quantity: i32,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "update products set stock = stock - $2, updated_at=now() \
             where id=$1 and active and stock >= $2",
        )
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Put `quantity` units back; a product deleted since the order is skipped
    #[tracing::instrument(name = "Restore product stock", skip(executor))]
    pub async fn restore_stock<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        quantity: i32,
    ) -> sqlx::Result<()> {
        sqlx::query("update products set stock = stock + $2, updated_at=now() where id=$1")
            .bind(id)
            .bind(quantity)
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;

    fn product(stock: i32, category_id: Option<Uuid>) -> ProductInput {
        ProductInput {
            title: "Cold Brew".into(),
            description: "Steeped for 18 hours".into(),
            price: 4.5,
            stock,
            images: vec![],
            category_id,
            active: true,
        }
    }

    #[sqlx::test]
    async fn stock_is_never_decremented_below_zero(pool: PgPool) {
        let product = ProductsRepo::insert(&pool, &product(2, None)).await.unwrap();

        assert!(!ProductsRepo::decrement_stock(&pool, product.id, 3).await.unwrap());
        assert!(ProductsRepo::decrement_stock(&pool, product.id, 2).await.unwrap());
        assert!(!ProductsRepo::decrement_stock(&pool, product.id, 1).await.unwrap());

        let product = ProductsRepo::fetch(&pool, product.id).await.unwrap().unwrap();
        assert_eq!(0, product.stock);
    }

    #[sqlx::test]
    async fn products_are_filtered_by_category_slug(pool: PgPool) {
        let drinks = CategoriesRepo::insert(
            &pool,
            &CategoryInput {
                name: "Drinks".into(),
                slug: None,
                description: String::new(),
            },
            &"drinks".parse().unwrap(),
        )
        .await
        .unwrap();
        ProductsRepo::insert(&pool, &product(5, Some(drinks.id)))
            .await
            .unwrap();
        ProductsRepo::insert(&pool, &product(5, None)).await.unwrap();

        let in_drinks = ProductsRepo::list(&pool, true, Some("drinks")).await.unwrap();
        assert_eq!(1, in_drinks.len());
        assert_eq!(2, ProductsRepo::list(&pool, true, None).await.unwrap().len());
        assert!(ProductsRepo::list(&pool, true, Some("pastries"))
            .await
            .unwrap()
            .is_empty());
    }

    #[sqlx::test]
    async fn inactive_products_are_hidden_from_the_storefront(pool: PgPool) {
        let product = ProductsRepo::insert(&pool, &product(1, None)).await.unwrap();
        ProductsRepo::set_active(&pool, product.id, false)
            .await
            .unwrap();

        assert!(ProductsRepo::list(&pool, true, None).await.unwrap().is_empty());
        assert_eq!(1, ProductsRepo::list(&pool, false, None).await.unwrap().len());
    }
}
