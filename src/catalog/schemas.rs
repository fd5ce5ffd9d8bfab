//! Record schemas of the Precoro resources

use crate::schema::JsonType::{Array, Number, Object, String as Str};
use crate::schema::{JsonSchema, JsonType, SchemaProperty};

const NUM_OR_STR: &[JsonType] = &[Number, Str];
const OBJ_OR_STR: &[JsonType] = &[Object, Str];
const OBJ_OR_ARR: &[JsonType] = &[Object, Array];
const ARR_OR_OBJ: &[JsonType] = &[Array, Object];
const OBJ_ARR_STR: &[JsonType] = &[Object, Array, Str];

pub(super) fn taxes() -> JsonSchema {
    JsonSchema::new()
        .number("id")
        .string("name")
        .number("percent")
        .number("value")
        .one_of("qboId", NUM_OR_STR)
        .number("taxAmount")
        .one_of("externalId", NUM_OR_STR)
        .boolean("isWithholdingTax")
        .one_of("xeroId", NUM_OR_STR)
}

/// Listing shape shared by invoices and expenses
pub(super) fn transactions() -> JsonSchema {
    JsonSchema::new()
        .number("id")
        .string("idn")
        .number("status")
        .date_time("updateDate")
        .string("statusString")
}

pub(super) fn invoice_details() -> JsonSchema {
    JsonSchema::new()
        .number("id")
        .string("idn")
        .number("status")
        .date_time("approvalDate")
        .string("customName")
        .date_time("updateDate")
        .date_time("createDate")
        .date_time("requiredDate")
        .date_time("issueDate")
        .date_time("updateExchangeRateDate")
        .string("sumPaid")
        .one_of("sumPaidInCompanyCurrency", NUM_OR_STR)
        .one_of("sum", NUM_OR_STR)
        .one_of("netSum", NUM_OR_STR)
        .one_of("sumInCompanyCurrency", NUM_OR_STR)
        .one_of("netSumInCompanyCurrency", NUM_OR_STR)
        .one_of("withholdingTaxSum", NUM_OR_STR)
        .string("currency")
        .one_of("precisionData", OBJ_OR_STR)
        .string("note")
        .one_of("exchangeRate", OBJ_OR_ARR)
        .boolean("fromSupplier")
        .string("statusString")
        .one_of("logicType", NUM_OR_STR)
        .string("invoiceNumber")
        .string("deliveryNote")
        .string("toleranceRateSum")
        .string("toleranceRatePercent")
        .one_of("purchaseOrder", ARR_OR_OBJ)
        .one_of("prepaymentPercent", NUM_OR_STR)
        .one_of("postpaymentPercent", NUM_OR_STR)
        .number("creditPeriodDays")
        .one_of("approvalStep", OBJ_OR_STR)
        .one_of("paymentTerm", OBJ_OR_STR)
        .one_of("company", OBJ_OR_STR)
        .one_of("qboId", NUM_OR_STR)
        .one_of("externalId", NUM_OR_STR)
        .one_of("xeroId", NUM_OR_STR)
        .one_of("budgetedSum", NUM_OR_STR)
        .string("usedTaxPercentInBudget")
        .string("allDocumentCustomFieldOptionsIds")
        .boolean("isRequiredTaxesForItems")
        .one_of("approvingWay", OBJ_ARR_STR)
        .one_of("location", OBJ_OR_STR)
        .one_of("supplier", OBJ_OR_STR)
        .one_of("budget", ARR_OR_OBJ)
        .one_of("budgetLine", ARR_OR_OBJ)
        .one_of("legalEntity", ARR_OR_OBJ)
        .one_of("creator", OBJ_OR_STR)
        .one_of("secondInCharge", ARR_OR_OBJ)
        .one_of("lastApprover", OBJ_OR_ARR)
        .one_of("approvalSteps", OBJ_OR_ARR)
        .one_of("items", OBJ_OR_ARR)
        .one_of("taxes", OBJ_OR_ARR)
        .one_of("comments", OBJ_OR_ARR)
        .one_of("payments", OBJ_OR_ARR)
        .one_of("followers", OBJ_OR_ARR)
        .one_of("dataDocumentCustomFields", OBJ_OR_ARR)
        .one_of("attachments", OBJ_OR_ARR)
        .one_of("allocatedInvoice", OBJ_OR_ARR)
        .one_of("contracts", OBJ_OR_ARR)
        .boolean("isBudgetOverLimit")
}

/// `{"data": [<item>]}` wrapper used by supplier sub-collections
fn data_list(item: SchemaProperty) -> SchemaProperty {
    SchemaProperty::object(&[("data", SchemaProperty::array(item))])
}

pub(super) fn suppliers() -> JsonSchema {
    let payment_term = SchemaProperty::object(&[
        ("id", SchemaProperty::nullable(Number)),
        ("name", SchemaProperty::nullable(Str)),
        ("prepaymentPercent", SchemaProperty::nullable(Number)),
        ("postpaymentPercent", SchemaProperty::nullable(Number)),
        ("creditPeriodDays", SchemaProperty::nullable(Number)),
        ("paymentType", SchemaProperty::nullable(Number)),
        ("enable", SchemaProperty::nullable(JsonType::Boolean)),
    ]);

    JsonSchema::new()
        .number("id")
        .string("uniqueCode")
        .string("name")
        .date_time("createDate")
        .date_time("updateDate")
        .string("legalAddress")
        .string("currency")
        .boolean("autoSendPOSupplier")
        .number("deliveryPeriod")
        .number("minimumSum")
        .string("businessRegistrationNumber")
        .string("accountHolderName")
        .string("bankName")
        .string("accountNumber")
        .string("bankAddress")
        .string("swiftCode")
        .string("permanentAccountNumber")
        .string("internationalBankAccountNumber")
        .string("americanBankersAssociationNumber")
        .string("indianFinancialSystemCode")
        .string("sortCode")
        .boolean("taxPayer")
        .with("currencies", SchemaProperty::array(SchemaProperty::nullable(Str)))
        .number("taxPayerType")
        .string("taxPayerLabel")
        .string("taxPayerNumber")
        .string("phone")
        .string("city")
        .string("country")
        .string("state")
        .string("postalCode")
        .string("note")
        .string("conditions")
        .boolean("enableToleranceRate")
        .number("toleranceRatePercent")
        .boolean("enable")
        .boolean("isMarketUpdatable")
        .string("qboId")
        .one_of("externalId", NUM_OR_STR)
        .string("xeroId")
        .with(
            "marketSupplier",
            SchemaProperty::object(&[("id", SchemaProperty::nullable(Str))]),
        )
        .boolean("enableMarketSupplier")
        .one_of("creditBalanceSums", OBJ_OR_ARR)
        .string("afaxysSupplierId")
        .integer("status")
        .with(
            "creator",
            SchemaProperty::object(&[("id", SchemaProperty::nullable(JsonType::Integer))]),
        )
        .boolean("enterInvoiceAsOneLine")
        .with("paymentTerms", data_list(payment_term))
        .with("approvalSteps", data_list(SchemaProperty::one_of(OBJ_OR_ARR)))
        .one_of("approvingWay", OBJ_ARR_STR)
        .with("contacts", data_list(SchemaProperty::one_of(OBJ_OR_ARR)))
        .with("marketContacts", data_list(SchemaProperty::one_of(OBJ_OR_ARR)))
        .one_of("supplierRegistration", OBJ_ARR_STR)
        .with(
            "approvalInfo",
            SchemaProperty::object(&[
                ("canApprove", SchemaProperty::nullable(JsonType::Boolean)),
                ("canReject", SchemaProperty::nullable(JsonType::Boolean)),
            ]),
        )
        .one_of("dataSupplierCustomFields", OBJ_OR_STR)
}

pub(super) fn items() -> JsonSchema {
    JsonSchema::new()
        .number("id")
        .string("name")
        .string("sku")
        .string("typeString")
        .string("description")
        .boolean("disabledBySupplier")
        .boolean("hiddenInCatalog")
        .boolean("freeOfCharge")
        .boolean("mainInSimilar")
        .one_of("category", OBJ_OR_ARR)
        .one_of("supplier", OBJ_OR_ARR)
        .one_of("similar", OBJ_OR_ARR)
        .one_of("marketProduct", OBJ_OR_ARR)
        .one_of("dataProductCustomFields", OBJ_OR_ARR)
        .one_of("bundleItems", OBJ_OR_ARR)
        .one_of("groupItems", OBJ_OR_ARR)
        .integer("type")
        .string("externalId")
        .string("xeroId")
        .date_time("createDate")
        .date_time("updateDate")
}

pub(super) fn expense_details() -> JsonSchema {
    JsonSchema::new()
        .integer("id")
        .string("idn")
        .string("customName")
        .date_time("updateDate")
        .date_time("createDate")
        .date_time("requiredDate")
        .date_time("issueDate")
        .date_time("approvalDate")
        .number("sumPaid")
        .number("sumPaidInCompanyCurrency")
        .number("sum")
        .number("netSum")
        .number("sumInCompanyCurrency")
        .number("netSumInCompanyCurrency")
        .number("withholdingTaxSum")
        .string("currency")
        .one_of("precisionData", OBJ_OR_STR)
        .string("note")
        .one_of("exchangeRate", OBJ_OR_ARR)
        .integer("status")
        .string("expenseNumber")
        .number("budgetedSum")
        .string("usedTaxPercentInBudget")
        .string("allDocumentCustomFieldOptionsIds")
        .string("qboId")
        .one_of("approvingWay", OBJ_ARR_STR)
        .one_of("location", OBJ_OR_STR)
        .one_of("budget", ARR_OR_OBJ)
        .one_of("creator", OBJ_OR_STR)
        .one_of("lastEditor", &[Object, Str, Array])
        .one_of("legalEntity", ARR_OR_OBJ)
        .one_of("approvalSteps", OBJ_OR_ARR)
        .one_of("items", OBJ_OR_ARR)
        .one_of("taxes", OBJ_OR_ARR)
        .one_of("comments", OBJ_OR_ARR)
        .one_of("expensePayments", OBJ_OR_ARR)
        .one_of("followers", OBJ_OR_ARR)
        .one_of("dataDocumentCustomFields", OBJ_OR_ARR)
        .one_of("attachments", OBJ_OR_ARR)
        .boolean("isBudgetOverLimit")
}
