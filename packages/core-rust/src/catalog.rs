//! The fifteen resource kinds managed by the AutoDrive console.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::schema::{FieldDef, Noun, ResourceDescriptor};

pub const USER_TYPES: &[&str] = &["ADMIN", "CLIENTE", "VENDEDOR"];
pub const VEHICLE_CONDITIONS: &[&str] = &["NOVO", "SEMINOVO", "USADO"];
pub const SALE_STATUSES: &[&str] = &["PENDENTE", "EM ANDAMENTO", "CONCLUIDA", "CANCELADA"];

/// Set of resource descriptors, looked up by path segment.
///
/// Building a catalog checks that every reference field points at a
/// resource registered in the same catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    descriptors: BTreeMap<&'static str, Arc<ResourceDescriptor>>,
}

impl Catalog {
    /// Builds a catalog from descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateResource`] if two descriptors share a
    /// name, or [`SchemaError::UnknownReferenceTarget`] for a dangling reference.
    pub fn new(
        descriptors: impl IntoIterator<Item = ResourceDescriptor>,
    ) -> Result<Self, SchemaError> {
        let mut map = BTreeMap::new();
        for descriptor in descriptors {
            let name = descriptor.name();
            if map.insert(name, Arc::new(descriptor)).is_some() {
                return Err(SchemaError::DuplicateResource {
                    resource: name.to_string(),
                });
            }
        }
        for descriptor in map.values() {
            for (field, target) in descriptor.references() {
                if !map.contains_key(target) {
                    return Err(SchemaError::UnknownReferenceTarget {
                        resource: descriptor.name().to_string(),
                        field: field.name.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(Self { descriptors: map })
    }

    /// The AutoDrive dealership catalog.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in descriptors are inconsistent.
    pub fn autodrive() -> Result<Self, SchemaError> {
        Self::new([
            ResourceDescriptor::builder("anuncios", Noun::masculine("anúncio", "anúncios"))
                .field(FieldDef::date_defaulting_to_now("dataAnuncio", "Data do Anúncio"))
                .field(FieldDef::number("preco", "Preço"))
                .field(FieldDef::long_text("descricao", "Descrição"))
                .field(FieldDef::text("foto", "URL da Foto"))
                .field(FieldDef::flag("vendido", "Vendido"))
                .option_label(&["descricao"])
                .build()?,
            ResourceDescriptor::builder("categorias", Noun::feminine("categoria", "categorias"))
                .field(FieldDef::text("nome", "Nome"))
                .field(FieldDef::long_text("descricao", "Descrição"))
                .option_label(&["descricao"])
                .list_columns(&["nome"])
                .build()?,
            ResourceDescriptor::builder("empresas", Noun::feminine("empresa", "empresas"))
                .field(FieldDef::text("nome", "Nome"))
                .field(FieldDef::text("cnpj", "CNPJ"))
                .field(FieldDef::text("logradouro", "Logradouro"))
                .field(FieldDef::text("numero", "Número"))
                .field(FieldDef::text("complemento", "Complemento"))
                .field(FieldDef::text("bairro", "Bairro"))
                .field(FieldDef::text("cidade", "Cidade"))
                .field(FieldDef::text("uf", "UF"))
                .field(FieldDef::text("cep", "CEP"))
                .option_label(&["nome"])
                .list_columns(&["nome", "cnpj", "logradouro", "cidade", "uf"])
                .build()?,
            ResourceDescriptor::builder("usuarios", Noun::masculine("usuário", "usuários"))
                .field(FieldDef::text("nome", "Nome"))
                .field(FieldDef::text("email", "Email"))
                .field(FieldDef::text("senha", "Senha"))
                .field(FieldDef::text("telefone", "Telefone"))
                .field(FieldDef::text("cpf", "CPF"))
                .field(FieldDef::choice("tipo", "Tipo", USER_TYPES))
                .field(FieldDef::text("logradouro", "Logradouro"))
                .field(FieldDef::number("numero", "Número"))
                .field(FieldDef::text("complemento", "Complemento"))
                .field(FieldDef::text("bairro", "Bairro"))
                .field(FieldDef::text("cidade", "Cidade"))
                .field(FieldDef::text("uf", "UF"))
                .field(FieldDef::text("cep", "CEP"))
                .field(FieldDef::reference("empresa", "Empresa", "empresas"))
                .option_label(&["nome"])
                .list_columns(&["nome", "email", "telefone", "cpf", "tipo", "empresa"])
                .build()?,
            ResourceDescriptor::builder("veiculos", Noun::masculine("veículo", "veículos"))
                .field(FieldDef::text("placa", "Placa"))
                .field(FieldDef::text("modelo", "Modelo"))
                .field(FieldDef::text("cor", "Cor"))
                .field(FieldDef::text("ano", "Ano"))
                .field(FieldDef::text("versao", "Versão"))
                .field(FieldDef::text("quilometragem", "Quilometragem"))
                .field(FieldDef::long_text("descricao", "Descrição"))
                .field(FieldDef::number("preco", "Preço"))
                .field(FieldDef::flag("ativo", "Ativo"))
                .field(FieldDef::choice("condicao", "Condição", VEHICLE_CONDITIONS))
                .field(FieldDef::date("anuncio", "Data Anúncio"))
                .field(FieldDef::reference("empresa", "Empresa", "empresas"))
                .field(FieldDef::reference("categoria", "Categoria", "categorias"))
                .field(FieldDef::reference("marca", "Marca", "marcas"))
                .field(FieldDef::reference("opcional", "Opcional", "opcionais"))
                .field(FieldDef::reference("tipo", "Tipo", "tipos"))
                .field(FieldDef::reference("foto", "Foto", "fotos"))
                .option_label(&["modelo", "placa"])
                .list_columns(&[
                    "placa", "modelo", "cor", "ano", "preco", "ativo", "condicao", "empresa",
                ])
                .build()?,
            ResourceDescriptor::builder("vendas", Noun::feminine("venda", "vendas"))
                .field(FieldDef::date("dataVenda", "Data da Venda"))
                .field(FieldDef::number("valorFinal", "Valor Final"))
                .field(FieldDef::flag("concluido", "Concluído"))
                .field(FieldDef::long_text("descricao", "Descrição"))
                .field(FieldDef::choice("status", "Status", SALE_STATUSES))
                .field(FieldDef::reference("usuario", "Usuário", "usuarios"))
                .field(FieldDef::reference("veiculo", "Veículo", "veiculos"))
                .option_label(&["dataVenda", "status"])
                .build()?,
            ResourceDescriptor::builder("financiamentos", Noun::masculine("financiamento", "financiamentos"))
                .field(FieldDef::number("valor", "Valor"))
                .field(FieldDef::number("parcela", "Parcela"))
                .field(FieldDef::long_text("observacao", "Observação"))
                .field(FieldDef::flag("aprovado", "Aprovado"))
                .field(FieldDef::reference("venda", "Venda", "vendas"))
                .build()?,
            ResourceDescriptor::builder("pagamentos", Noun::masculine("pagamento", "pagamentos"))
                .field(FieldDef::text("status", "Status"))
                .field(FieldDef::text("metodo", "Método"))
                .field(FieldDef::date("dataPagamento", "Data Pagamento"))
                .field(FieldDef::long_text("descricao", "Descrição"))
                .field(FieldDef::reference("venda", "Venda", "vendas"))
                .build()?,
            ResourceDescriptor::builder("propostas", Noun::feminine("proposta", "propostas"))
                .field(FieldDef::long_text("descricao", "Descrição"))
                .field(FieldDef::number("valor", "Valor"))
                .field(FieldDef::reference("usuario", "Usuário", "usuarios"))
                .build()?,
            ResourceDescriptor::builder("fotos", Noun::feminine("foto", "fotos"))
                .field(FieldDef::text("foto", "Foto (URL)"))
                .option_label(&["foto"])
                .build()?,
            ResourceDescriptor::builder("marcas", Noun::feminine("marca", "marcas"))
                .field(FieldDef::text("nome", "Nome"))
                .option_label(&["nome"])
                .build()?,
            ResourceDescriptor::builder("opcionais", Noun::masculine("opcional", "opcionais"))
                .field(FieldDef::text("descricao", "Descrição"))
                .field(FieldDef::flag("arCondicionado", "Ar Condicionado"))
                .field(FieldDef::flag("direcaoHidraulica", "Direção Hidráulica"))
                .field(FieldDef::flag("vidroEletrico", "Vidro Elétrico"))
                .field(FieldDef::flag("cameraRe", "Câmera de Ré"))
                .field(FieldDef::flag("sensor", "Sensor"))
                .field(FieldDef::flag("completo", "Completo"))
                .option_label(&["descricao"])
                .build()?,
            ResourceDescriptor::builder("notificacoes", Noun::feminine("notificação", "notificações"))
                .field(FieldDef::text("titulo", "Título"))
                .field(FieldDef::long_text("descricao", "Descrição"))
                .field(FieldDef::number("valor", "Valor"))
                .field(FieldDef::date("dataCriacao", "Data Criação"))
                .field(FieldDef::reference("usuario", "Usuário", "usuarios"))
                .option_label(&["titulo"])
                .build()?,
            ResourceDescriptor::builder("favoritos", Noun::masculine("favorito", "favoritos"))
                .field(FieldDef::date("dataFavorito", "Data Favorito"))
                .field(FieldDef::long_text("descricao", "Descrição"))
                .field(FieldDef::reference("usuario", "Usuário", "usuarios"))
                .field(FieldDef::reference("veiculo", "Veículo", "veiculos"))
                .build()?,
            ResourceDescriptor::builder("tipos", Noun::masculine("tipo", "tipos"))
                .field(FieldDef::text("nome", "Nome"))
                .option_label(&["nome"])
                .build()?,
        ])
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ResourceDescriptor>> {
        self.descriptors.get(name).cloned()
    }

    /// Descriptors ordered by resource name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceDescriptor>> {
        self.descriptors.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autodrive_catalog_has_fifteen_resources() {
        let catalog = Catalog::autodrive().expect("built-in catalog is consistent");
        assert_eq!(catalog.len(), 15);
        for name in [
            "anuncios",
            "categorias",
            "empresas",
            "usuarios",
            "veiculos",
            "vendas",
            "financiamentos",
            "pagamentos",
            "propostas",
            "fotos",
            "marcas",
            "opcionais",
            "notificacoes",
            "favoritos",
            "tipos",
        ] {
            assert!(catalog.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn sale_depends_on_users_and_vehicles() {
        let catalog = Catalog::autodrive().unwrap();
        let sale = catalog.get("vendas").unwrap();
        assert_eq!(sale.auxiliary_resources(), vec!["usuarios", "veiculos"]);

        let vehicle = catalog.get("veiculos").unwrap();
        assert_eq!(
            vehicle.auxiliary_resources(),
            vec!["empresas", "categorias", "marcas", "opcionais", "tipos", "fotos"]
        );
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let orphan = ResourceDescriptor::builder("propostas", Noun::feminine("proposta", "propostas"))
            .field(FieldDef::reference("usuario", "Usuário", "usuarios"))
            .build()
            .unwrap();
        let err = Catalog::new([orphan]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownReferenceTarget { .. }));
    }

    #[test]
    fn duplicate_resource_is_rejected() {
        let brand = || {
            ResourceDescriptor::builder("marcas", Noun::feminine("marca", "marcas"))
                .field(FieldDef::text("nome", "Nome"))
                .build()
                .unwrap()
        };
        let err = Catalog::new([brand(), brand()]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateResource { .. }));
    }
}
