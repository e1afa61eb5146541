pub mod freight;
pub mod invoices;

pub use freight::{FreightQuoteRequest, PayerQuotesRequest, QuotesResponse};
pub use invoices::{
    GenerateInvoiceRequest, GenerateInvoiceResponse, InvoiceDetailResponse, InvoiceResponse,
    LineItemResponse, UsageCalculationResponse,
};
