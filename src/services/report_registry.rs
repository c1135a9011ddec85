//! Static catalogue of report types: which sections each one aggregates, the
//! prompt template sent to the narrative model and sample requests.

use crate::models::ReportType;

/// One data-fetch step of the aggregation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    SalesOverview,
    SalesByCategory,
    TopProducts,
    TopCustomers,
    DailySales,
    ProductStock,
    SupplyStock,
    Production,
    Orders,
    Purchases,
    TopSupplies,
    Customers,
    Financials,
}

impl Section {
    /// Metric groups this section always emits, possibly empty.
    pub fn groups(&self) -> &'static [&'static str] {
        match self {
            Section::SalesOverview => &[],
            Section::SalesByCategory => &["by_category"],
            Section::TopProducts => &["top_products"],
            Section::TopCustomers => &["top_customers"],
            Section::DailySales => &["daily_sales"],
            Section::ProductStock => &["stock_status", "low_stock"],
            Section::SupplyStock => &["supplies"],
            Section::Production => &["production_batches", "production_by_product"],
            Section::Orders => &["orders_by_status", "frequent_customers", "recent_orders"],
            Section::Purchases => &["purchases", "purchases_by_supplier"],
            Section::TopSupplies => &["top_supplies"],
            Section::Customers => &["customers", "customer_segments"],
            Section::Financials => &["revenue_by_category", "cost_by_supplier"],
        }
    }
}

#[derive(Debug)]
pub struct ReportSpec {
    pub report_type: ReportType,
    pub title: &'static str,
    pub description: &'static str,
    pub sections: &'static [Section],
    /// Template with a `{datos}` placeholder for the aggregated JSON.
    pub prompt: &'static str,
    pub examples: &'static [&'static str],
}

impl ReportSpec {
    pub fn group_names(&self) -> Vec<&'static str> {
        self.sections.iter().flat_map(|s| s.groups().iter().copied()).collect()
    }
}

static VENTAS: ReportSpec = ReportSpec {
    report_type: ReportType::Ventas,
    title: "Ventas",
    description: "Análisis completo de ventas",
    sections: &[
        Section::SalesOverview,
        Section::SalesByCategory,
        Section::TopProducts,
        Section::TopCustomers,
        Section::DailySales,
    ],
    prompt: r#"Analiza los datos de ventas de la panadería para el período indicado:

{datos}

Evalúa el desempeño total y su variación, los productos estrella y los de baja salida,
el comportamiento de los clientes principales y las categorías con mejor y peor resultado.
Incluye de 3 a 5 recomendaciones accionables y una proyección breve para el próximo período.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), proyeccion."#,
    examples: &[
        "¿Cuáles fueron mis ventas en noviembre?",
        "Dime el producto más vendido este mes",
        "Quiero ver los clientes que más han comprado",
        "Genera un reporte de ventas por categoría para el último trimestre",
        "¿Cuánto dinero he ganado este año?",
    ],
};

static INVENTARIO: ReportSpec = ReportSpec {
    report_type: ReportType::Inventario,
    title: "Inventario",
    description: "Análisis de inventario",
    sections: &[Section::ProductStock, Section::SupplyStock],
    prompt: r#"Analiza el estado actual del inventario de productos e insumos de la panadería:

{datos}

Identifica los ítems críticos bajo el mínimo, los riesgos de desabastecimiento y las compras
urgentes. Propón una estrategia de gestión de inventario para las próximas semanas.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), riesgos."#,
    examples: &[
        "¿Cuáles son los productos con stock bajo?",
        "Necesito ver el estado actual del inventario",
        "¿Qué productos tienen mejor rotación?",
        "Dime el valor total del inventario",
    ],
};

static PRODUCCION: ReportSpec = ReportSpec {
    report_type: ReportType::Produccion,
    title: "Produccion",
    description: "Análisis de producción",
    sections: &[Section::Production],
    prompt: r#"Analiza los lotes de producción de la panadería en el período:

{datos}

Evalúa la eficiencia (lotes terminados frente a pendientes), los productos más elaborados y
posibles cuellos de botella. Sugiere mejoras concretas para aumentar la capacidad.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), eficiencia."#,
    examples: &[
        "¿Cuántas unidades producimos este mes?",
        "¿Cuál es la receta más usada?",
        "Necesito un análisis de eficiencia de producción",
        "¿Cuál fue el costo de producción en octubre?",
    ],
};

static PEDIDOS: ReportSpec = ReportSpec {
    report_type: ReportType::Pedidos,
    title: "Pedidos",
    description: "Análisis de pedidos",
    sections: &[Section::Orders],
    prompt: r#"Analiza los pedidos de clientes de la panadería en el período:

{datos}

Revisa el volumen, el cumplimiento de entregas y pagos, el tiempo promedio de entrega y los
clientes con pedidos frecuentes. Señala problemas recurrentes y cómo mejorar el servicio.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), entregas."#,
    examples: &[
        "¿Cuál es el estado de los pedidos pendientes?",
        "Quién es mi cliente más frecuente?",
        "¿Cuál es el tiempo promedio de entrega?",
        "Necesito un análisis de satisfacción de clientes",
    ],
};

static COMPRAS: ReportSpec = ReportSpec {
    report_type: ReportType::Compras,
    title: "Compras",
    description: "Análisis de compras a proveedores",
    sections: &[Section::Purchases, Section::TopSupplies],
    prompt: r#"Analiza las compras de insumos de la panadería en el período:

{datos}

Evalúa el gasto por proveedor, los insumos de mayor costo y las oportunidades de negociación.
Recomienda acciones para reducir costos y una proyección de gasto.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), proyeccion."#,
    examples: &[],
};

static CLIENTES: ReportSpec = ReportSpec {
    report_type: ReportType::Clientes,
    title: "Clientes",
    description: "Análisis de clientes",
    sections: &[Section::Customers, Section::TopCustomers],
    prompt: r#"Analiza el comportamiento de los clientes de la panadería:

{datos}

Usa la segmentación (VIP, regulares, ocasionales, inactivos) para describir la rentabilidad,
los clientes en riesgo de pérdida y las oportunidades de venta cruzada. Propón acciones de
retención.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), segmentacion."#,
    examples: &[],
};

static FINANCIERO: ReportSpec = ReportSpec {
    report_type: ReportType::Financiero,
    title: "Financiero",
    description: "Análisis financiero",
    sections: &[Section::SalesOverview, Section::Financials],
    prompt: r#"Realiza un análisis financiero de la panadería para el período:

{datos}

Compara ingresos por ventas con el costo de compras, interpreta el margen bruto y la
rentabilidad por categoría, e identifica oportunidades de ahorro.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), proyecciones."#,
    examples: &[],
};

static TENDENCIAS: ReportSpec = ReportSpec {
    report_type: ReportType::Tendencias,
    title: "Tendencias",
    description: "Análisis de tendencias",
    sections: &[Section::SalesOverview, Section::DailySales, Section::TopProducts],
    prompt: r#"Analiza las tendencias de ventas diarias de la panadería:

{datos}

Describe si las ventas crecen, caen o se mantienen, posibles ciclos semanales y los productos
que impulsan el resultado. Plantea escenarios realistas para el próximo mes.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), escenarios."#,
    examples: &[],
};

static GENERAL: ReportSpec = ReportSpec {
    report_type: ReportType::General,
    title: "General",
    description: "Reporte ejecutivo general",
    sections: &[
        Section::SalesOverview,
        Section::TopProducts,
        Section::ProductStock,
        Section::Orders,
    ],
    prompt: r#"Genera un reporte ejecutivo de la panadería con los siguientes datos:

{datos}

Resume el desempeño del negocio, los logros y desafíos principales, los riesgos y las
oportunidades clave. Incluye un plan de acción para las próximas dos semanas.

Responde en JSON con las claves: analysis, insights (lista), recommendations (lista), plan_accion."#,
    examples: &[],
};

pub fn lookup(report_type: ReportType) -> &'static ReportSpec {
    match report_type {
        ReportType::Ventas => &VENTAS,
        ReportType::Inventario => &INVENTARIO,
        ReportType::Produccion => &PRODUCCION,
        ReportType::Pedidos => &PEDIDOS,
        ReportType::Compras => &COMPRAS,
        ReportType::Clientes => &CLIENTES,
        ReportType::Financiero => &FINANCIERO,
        ReportType::Tendencias => &TENDENCIAS,
        ReportType::General => &GENERAL,
    }
}

pub fn all() -> impl Iterator<Item = &'static ReportSpec> {
    ReportType::ALL.into_iter().map(lookup)
}
