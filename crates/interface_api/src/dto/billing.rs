//! Billing DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{CustomerId, PageRequest, ProductId};
use domain_billing::{
    BillLineView, BillQuery, BillStatus, BillType, BillView, CreateBillRequest,
    CreditPaymentRequest, Customer, PaymentMethod, ReturnLine, ReturnRequest, SaleLine,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBillDto {
    pub customer_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub items: Vec<BillItemDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillItemDto {
    pub product_id: Uuid,
    pub quantity: i32,
    pub discount_per_unit: Option<Decimal>,
}

impl From<CreateBillDto> for CreateBillRequest {
    fn from(dto: CreateBillDto) -> Self {
        CreateBillRequest {
            customer_id: dto.customer_id.map(CustomerId::from_uuid),
            payment_method: dto.payment_method,
            lines: dto
                .items
                .into_iter()
                .map(|item| SaleLine {
                    product_id: ProductId::from_uuid(item.product_id),
                    quantity: item.quantity,
                    discount_per_unit: item.discount_per_unit,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReturnBillDto {
    #[validate(length(min = 1, max = 64, message = "Bill number must be 1-64 characters"))]
    pub original_bill_number: String,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub items: Vec<ReturnItemDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReturnItemDto {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl From<ReturnBillDto> for ReturnRequest {
    fn from(dto: ReturnBillDto) -> Self {
        ReturnRequest {
            bill_number: dto.original_bill_number,
            payment_method: dto.payment_method,
            lines: dto
                .items
                .into_iter()
                .map(|item| ReturnLine::new(ProductId::from_uuid(item.product_id), item.quantity))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreditPaymentDto {
    pub customer_id: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
}

impl From<CreditPaymentDto> for CreditPaymentRequest {
    fn from(dto: CreditPaymentDto) -> Self {
        CreditPaymentRequest {
            customer_id: dto.customer_id.map(CustomerId::from_uuid),
            amount: dto.amount,
            payment_method: dto.payment_method,
        }
    }
}

/// Paging window shared by the list endpoints
#[derive(Debug, Deserialize, Validate)]
pub struct PageParams {
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageParams {
    pub fn page_request(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest::new(
            self.limit.unwrap_or(default.limit),
            self.offset.unwrap_or(default.offset),
        )
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListBillsParams {
    #[validate(length(max = 100, message = "search must be at most 100 characters"))]
    pub search: Option<String>,
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListBillsParams {
    pub fn query(&self) -> BillQuery {
        let page = PageParams {
            limit: self.limit,
            offset: self.offset,
        };
        BillQuery {
            search: self.search.clone(),
            customer_id: None,
            page: page.page_request(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_per_unit: Decimal,
    pub line_total: Decimal,
}

impl From<BillLineView> for BillItemResponse {
    fn from(line: BillLineView) -> Self {
        Self {
            product_id: *line.product_id.as_uuid(),
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: line.unit_price.amount(),
            discount_per_unit: line.discount_per_unit.amount(),
            line_total: line.line_total.amount(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillResponse {
    pub id: Uuid,
    pub bill_number: String,
    pub bill_date: DateTime<Utc>,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_contact: String,
    pub customer_email: Option<String>,
    pub bill_type: BillType,
    pub bill_status: BillStatus,
    pub payment_method: PaymentMethod,
    pub currency: String,
    pub total_amount: Decimal,
    pub total_discount: Decimal,
    pub original_bill_number: String,
    pub items: Vec<BillItemResponse>,
}

impl From<BillView> for BillResponse {
    fn from(view: BillView) -> Self {
        Self {
            id: *view.bill_id.as_uuid(),
            bill_number: view.bill_number,
            bill_date: view.bill_date,
            customer_id: *view.customer_id.as_uuid(),
            customer_name: view.customer_name,
            customer_contact: view.customer_contact,
            customer_email: view.customer_email,
            bill_type: view.bill_type,
            bill_status: view.bill_status,
            payment_method: view.payment_method,
            currency: view.total_amount.currency().code().to_string(),
            total_amount: view.total_amount.amount(),
            total_discount: view.total_discount.amount(),
            original_bill_number: view.original_bill_number,
            items: view.lines.into_iter().map(BillItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreditCustomerResponse {
    pub customer_id: Uuid,
    pub name: String,
    pub contact: String,
    pub email: Option<String>,
    pub credit_balance: Decimal,
}

impl From<Customer> for CreditCustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            customer_id: *customer.id.as_uuid(),
            name: customer.name,
            contact: customer.contact,
            email: customer.email,
            credit_balance: customer.credit_balance.amount(),
        }
    }
}
