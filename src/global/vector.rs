use crate::container::{CloneMode, LocalVector, Operand};
use crate::error::Result;
use crate::global::{Gate, ScalarTicket, VectorTicket};
use lafem_arch::Real;

/// A local vector together with the gate that connects it to the other ranks.
///
/// Without a gate all operations degrade to their local counterparts.
#[derive(Debug, Clone)]
pub struct GlobalVector<'g, T: Real, V: LocalVector<T>> {
    gate: Option<&'g Gate<T, V>>,
    local: V,
}

fn local_operand<'a, 'g, T: Real, V: LocalVector<T>>(operand: Operand<'a, GlobalVector<'g, T, V>>) -> Operand<'a, V> {
    match operand {
        Operand::This => Operand::This,
        Operand::Other(v) => Operand::Other(&v.local),
    }
}

impl<'g, T: Real, V: LocalVector<T>> GlobalVector<'g, T, V> {
    pub fn new(gate: Option<&'g Gate<T, V>>, local: V) -> Self {
        Self { gate, local }
    }

    pub fn local(&self) -> &V {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut V {
        &mut self.local
    }

    pub fn into_local(self) -> V {
        self.local
    }

    pub fn gate(&self) -> Option<&'g Gate<T, V>> {
        self.gate
    }

    /// Number of distinct global entries.
    pub fn size(&self) -> Result<usize> {
        match self.gate {
            Some(gate) => gate.global_size(),
            None => Ok(self.local.size()),
        }
    }

    pub fn sync_0(&mut self) -> Result<()> {
        match self.gate {
            Some(gate) => gate.sync_0(&mut self.local),
            None => Ok(()),
        }
    }

    pub fn sync_1(&mut self) -> Result<()> {
        match self.gate {
            Some(gate) => gate.sync_1(&mut self.local),
            None => Ok(()),
        }
    }

    /// Starts a type-0 to type-1 synchronization. The vector is borrowed until the ticket
    /// completes.
    pub fn sync_0_async(&mut self) -> Result<Option<VectorTicket<'_, T, V>>> {
        match self.gate {
            Some(gate) => Ok(Some(gate.sync_0_async(&mut self.local)?)),
            None => Ok(None),
        }
    }

    pub fn sync_1_async(&mut self) -> Result<Option<VectorTicket<'_, T, V>>> {
        match self.gate {
            Some(gate) => Ok(Some(gate.sync_1_async(&mut self.local)?)),
            None => Ok(None),
        }
    }

    pub fn from_1_to_0(&mut self) -> Result<()> {
        match self.gate {
            Some(gate) => gate.from_1_to_0(&mut self.local),
            None => Ok(()),
        }
    }

    pub fn clone_with(&self, mode: CloneMode) -> Self {
        Self {
            gate: self.gate,
            local: self.local.clone_with(mode),
        }
    }

    pub fn format(&mut self, value: T) {
        self.local.format(value);
    }

    pub fn copy_from(&mut self, other: &Self) -> Result<()> {
        self.local.copy_from(&other.local)
    }

    pub fn axpy(&mut self, x: Operand<Self>, y: Operand<Self>, alpha: T) -> Result<()> {
        self.local.axpy(local_operand(x), local_operand(y), alpha)
    }

    pub fn scale(&mut self, x: Operand<Self>, alpha: T) -> Result<()> {
        self.local.scale(local_operand(x), alpha)
    }

    pub fn component_product(&mut self, x: Operand<Self>, y: Operand<Self>) -> Result<()> {
        self.local.component_product(local_operand(x), local_operand(y))
    }

    pub fn component_invert(&mut self, x: Operand<Self>, alpha: T) -> Result<()> {
        self.local.component_invert(local_operand(x), alpha)
    }

    pub fn dot(&self, other: &Self) -> Result<T> {
        match self.gate {
            Some(gate) => gate.dot(&self.local, &other.local),
            None => self.local.dot(&other.local),
        }
    }

    pub fn dot_async(&self, other: &Self) -> Result<ScalarTicket<'g, T>> {
        match self.gate {
            Some(gate) => gate.dot_async(&self.local, &other.local),
            None => Ok(ScalarTicket::local(self.local.dot(&other.local)?, false)),
        }
    }

    pub fn norm2sqr(&self) -> Result<T> {
        match self.gate {
            Some(gate) => gate.norm2sqr(&self.local),
            None => Ok(self.local.norm2sqr()),
        }
    }

    pub fn norm2(&self) -> Result<T> {
        match self.gate {
            Some(gate) => gate.norm2(&self.local),
            None => Ok(self.local.norm2()),
        }
    }

    pub fn norm2sqr_async(&self) -> Result<ScalarTicket<'g, T>> {
        match self.gate {
            Some(gate) => gate.norm2sqr_async(&self.local),
            None => Ok(ScalarTicket::local(self.local.norm2sqr(), false)),
        }
    }

    pub fn norm2_async(&self) -> Result<ScalarTicket<'g, T>> {
        match self.gate {
            Some(gate) => gate.norm2_async(&self.local),
            None => Ok(ScalarTicket::local(self.local.norm2sqr(), true)),
        }
    }

    pub fn max_abs_element(&self) -> Result<T> {
        match self.gate {
            Some(gate) => gate.max_abs_element(&self.local),
            None => Ok(self.local.max_abs_element()),
        }
    }

    pub fn max_abs_element_async(&self) -> Result<ScalarTicket<'g, T>> {
        match self.gate {
            Some(gate) => gate.max_abs_element_async(&self.local),
            None => Ok(ScalarTicket::local(self.local.max_abs_element(), false)),
        }
    }

    pub fn min_abs_element(&self) -> Result<T> {
        match self.gate {
            Some(gate) => gate.min_abs_element(&self.local),
            None => Ok(self.local.min_abs_element()),
        }
    }

    pub fn max_element(&self) -> Result<T> {
        match self.gate {
            Some(gate) => gate.max_element(&self.local),
            None => Ok(self.local.max_element()),
        }
    }

    pub fn min_element(&self) -> Result<T> {
        match self.gate {
            Some(gate) => gate.min_element(&self.local),
            None => Ok(self.local.min_element()),
        }
    }
}
