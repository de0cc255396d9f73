use shop_common::Cents;

use crate::{
    db_types::{CartItem, NewProduct, Product, ShippingAddress, UserId},
    traits::{CartManagement, InventoryManagement},
};

pub fn sample_address() -> ShippingAddress {
    ShippingAddress {
        address: "1 Infinite Loop".to_string(),
        city: "Cupertino".to_string(),
        postal_code: "95014".to_string(),
        country: "USA".to_string(),
    }
}

pub async fn seed_product<B: InventoryManagement>(db: &B, id: &str, price: i64, stock: i64) -> Product {
    let product = NewProduct::new(id.into(), format!("Product {id}"), Cents::from(price), stock);
    db.upsert_product(product).await.expect("Error seeding product")
}

/// Puts `quantity` units of `product` in the user's cart at the product's current price.
pub async fn fill_cart<B: CartManagement>(db: &B, user_id: &UserId, product: &Product, quantity: i64) {
    let item = CartItem {
        product_id: product.product_id.clone(),
        quantity,
        price: product.price,
        name: product.name.clone(),
        image: product.image.clone(),
    };
    db.add_cart_item(user_id, item).await.expect("Error filling cart");
}
